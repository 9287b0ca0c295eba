//! # Queued Requests
//!
//! A request waiting for its namespace to resolve. Each variant carries
//! everything it needs to fire once the gateway's node id is known.

use crate::domain::errors::GatewayError;
use shared_types::{
    AppAttachRequest, FetchAnswer, Message, NodeId, ResourceId, StoreAnswer, StoreKindData,
    StoredDataSpecifier,
};
use tokio::sync::oneshot;

/// Reply channel of a queued request.
pub type Reply<T> = oneshot::Sender<Result<T, GatewayError>>;

/// A request queued behind a namespace lookup.
#[derive(Debug)]
pub enum GatewayRequest {
    /// Fetch from a resource in the other overlay.
    Fetch {
        resource: ResourceId,
        specifiers: Vec<StoredDataSpecifier>,
        reply: Reply<FetchAnswer>,
    },
    /// Store into a resource in the other overlay.
    Store {
        resource: ResourceId,
        kind_data: Vec<StoreKindData>,
        reply: Reply<StoreAnswer>,
    },
    /// Open an application connection to a peer in the other overlay.
    AppAttach {
        target: NodeId,
        request: AppAttachRequest,
        reply: Reply<AppAttachRequest>,
    },
    /// Carry an existing message through the gateway.
    Forward { message: Message },
}

impl GatewayRequest {
    /// Short name for logs and events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Store { .. } => "store",
            Self::AppAttach { .. } => "app_attach",
            Self::Forward { .. } => "forward",
        }
    }

    /// Fail the request.
    ///
    /// Returns the carried message of a `Forward`, whose originator is told
    /// over the wire rather than through a reply channel.
    pub fn fail(self, err: GatewayError) -> Option<Message> {
        // A dropped receiver means the caller stopped waiting.
        match self {
            Self::Fetch { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::Store { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::AppAttach { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::Forward { message } => return Some(message),
        }
        None
    }
}

/// What `receive` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Injected into this overlay.
    DestinationReached,
    /// Sent on toward another gateway; delivery not yet confirmed.
    Relayed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fail_reaches_waiting_caller() {
        let (tx, rx) = oneshot::channel();
        let request = GatewayRequest::Fetch {
            resource: ResourceId::from_name("r"),
            specifiers: vec![],
            reply: tx,
        };
        assert_eq!(request.kind(), "fetch");
        assert!(request.fail(GatewayError::Cancelled).is_none());
        assert_eq!(rx.await.unwrap(), Err(GatewayError::Cancelled));
    }

    #[test]
    fn test_failed_forward_hands_back_its_message() {
        let message = Message::request(
            NodeId::new([7; shared_types::ID_LEN]),
            3,
            vec![],
            shared_types::MessageBody::PingReq,
        );
        let request = GatewayRequest::Forward {
            message: message.clone(),
        };
        assert_eq!(request.fail(GatewayError::Cancelled), Some(message));
    }
}
