//! # Gateway Adapters
//!
//! Connect the gateway relay to its overlay: the router carries its
//! messages, ReDiR resolves its namespaces, and the router hands it
//! cross-overlay traffic through `GatewayPort`.

use async_trait::async_trait;
use rl_02_routing::{GatewayPort, Router, RoutingApi, RoutingError};
use rl_03_redir::{RedirApi, RedirService};
use rl_04_gateway::{GatewayError, GatewayOutcome, GatewayRelay, OverlayMessenger, ServiceResolver};
use shared_types::{Destination, ErrorAnswer, Message, MessageBody, NodeId};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

fn gateway_error(err: RoutingError) -> GatewayError {
    match err {
        RoutingError::Remote { code, reason } => GatewayError::Remote { code, reason },
        other => GatewayError::Routing(other.to_string()),
    }
}

/// `OverlayMessenger` backed by the peer's router.
pub struct RouterMessenger {
    router: Arc<Router>,
}

impl RouterMessenger {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl OverlayMessenger for RouterMessenger {
    fn local_node_id(&self) -> NodeId {
        self.router.node_id()
    }

    fn create_message(
        &self,
        destination: Destination,
        body: MessageBody,
    ) -> Result<Message, GatewayError> {
        self.router
            .create_message(destination, body)
            .map_err(gateway_error)
    }

    fn sign(&self, message: &mut Message) -> Result<(), GatewayError> {
        self.router.sign(message).map_err(gateway_error)
    }

    fn submit(&self, message: Message) -> Result<(), GatewayError> {
        self.router.submit(message).map_err(gateway_error)
    }

    fn reject(&self, request: &Message, error: ErrorAnswer) -> Result<(), GatewayError> {
        let body = MessageBody::Error(error);
        let mut answer = Message::answer_to(request, self.router.node_id(), body)
            .with_ttl(self.router.config().initial_ttl);
        self.router.sign(&mut answer).map_err(gateway_error)?;
        self.router.submit(answer).map_err(gateway_error)
    }

    fn deliver_local(&self, message: Message) {
        self.router.inject(message);
    }

    async fn request(&self, message: Message) -> Result<MessageBody, GatewayError> {
        self.router
            .request_message(message)
            .await
            .map_err(gateway_error)
    }
}

/// `ServiceResolver` backed by ReDiR.
pub struct RedirResolver {
    redir: Arc<RedirService>,
}

impl RedirResolver {
    #[must_use]
    pub fn new(redir: Arc<RedirService>) -> Self {
        Self { redir }
    }
}

#[async_trait]
impl ServiceResolver for RedirResolver {
    async fn resolve(&self, namespace: &str) -> Result<NodeId, GatewayError> {
        self.redir
            .lookup(namespace)
            .await
            .map_err(|e| GatewayError::LookupFailed {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
    }
}

/// `GatewayPort` the router calls with cross-overlay traffic.
///
/// Holds the relay weakly: the relay already owns the router through its
/// messenger.
pub struct RelayGatewayPort {
    relay: Weak<GatewayRelay>,
}

impl RelayGatewayPort {
    #[must_use]
    pub fn new(relay: &Arc<GatewayRelay>) -> Self {
        Self {
            relay: Arc::downgrade(relay),
        }
    }
}

impl GatewayPort for RelayGatewayPort {
    fn bridges(&self, overlay: &str) -> bool {
        self.relay
            .upgrade()
            .is_some_and(|relay| relay.bridges(overlay))
    }

    fn receive(&self, destination_overlay: &str, message: Message) {
        let Some(relay) = self.relay.upgrade() else {
            warn!(destination_overlay, "Gateway gone, message dropped");
            return;
        };
        let tx = message.transaction_id();
        let request = message.is_request().then(|| message.clone());
        match relay.receive(destination_overlay, message) {
            Ok(GatewayOutcome::DestinationReached) => {
                debug!(destination_overlay, tx, "Message handed into overlay");
            }
            Ok(GatewayOutcome::Relayed) => {
                debug!(destination_overlay, tx, "Message relayed toward gateway");
            }
            Err(err) => {
                warn!(destination_overlay, tx, error = %err, "Gateway rejected message");
                if let Some(request) = request {
                    relay.reject(&request, &err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ErrorCode;

    #[test]
    fn test_remote_errors_keep_their_code() {
        let err = gateway_error(RoutingError::Remote {
            code: ErrorCode::Forbidden,
            reason: "no".into(),
        });
        assert_eq!(
            err,
            GatewayError::Remote {
                code: ErrorCode::Forbidden,
                reason: "no".into()
            }
        );
        assert!(matches!(
            gateway_error(RoutingError::TtlExceeded),
            GatewayError::Routing(_)
        ));
    }
}
