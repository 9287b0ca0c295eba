//! Request handlers, one per request code.

use super::Router;
use crate::domain::RoutingError;
use shared_types::{
    AppAttachRequest, AttachRequest, FetchAnswer, FetchKindResponse, FetchRequest, Message,
    MessageBody, PingAnswer, StoreAnswer, StoreRequest,
};
use tracing::debug;

/// Serve a locally terminal request.
///
/// # Errors
///
/// `ProtocolViolation` for a request code without a handler; storage errors
/// from Store and Fetch.
pub(super) fn handle_request(router: &Router, request: &Message) -> Result<MessageBody, RoutingError> {
    match &request.body {
        MessageBody::PingReq => Ok(ping()),
        MessageBody::StoreReq(req) => store(router, req),
        MessageBody::FetchReq(req) => fetch(router, req),
        MessageBody::AttachReq(req) => Ok(MessageBody::AttachAns(attach(router, req))),
        MessageBody::AppAttachReq(req) => Ok(MessageBody::AppAttachAns(app_attach(router, req))),
        MessageBody::JoinReq(req) => {
            debug!(peer = %req.joining_peer, "Join request");
            let payload = router.topology.on_join(req.joining_peer, &req.overlay_data);
            Ok(MessageBody::JoinAns(payload))
        }
        MessageBody::LeaveReq(req) => {
            debug!(peer = %req.leaving_peer, "Leave request");
            router.topology.on_leave(req.leaving_peer);
            Ok(MessageBody::LeaveAns)
        }
        MessageBody::UpdateReq(payload) => {
            router.topology.on_update(request.originator, payload);
            Ok(MessageBody::UpdateAns)
        }
        other => Err(RoutingError::ProtocolViolation {
            code: other.code(),
            detail: "no handler for request code".to_string(),
        }),
    }
}

fn ping() -> MessageBody {
    MessageBody::PingAns(PingAnswer {
        response_id: rand::random(),
        time: shared_types::now_millis(),
    })
}

fn store(router: &Router, req: &StoreRequest) -> Result<MessageBody, RoutingError> {
    let kinds = router.storage.store(req.resource, &req.kind_data)?;
    debug!(
        resource_id = %req.resource,
        replica = req.replica_number,
        kinds = kinds.len(),
        "Served store"
    );
    Ok(MessageBody::StoreAns(StoreAnswer { kinds }))
}

/// An unknown resource answers like a known one holding nothing, so callers
/// cannot tell "no values" from "never stored".
fn fetch(router: &Router, req: &FetchRequest) -> Result<MessageBody, RoutingError> {
    let mut kind_responses = Vec::with_capacity(req.specifiers.len());
    for spec in &req.specifiers {
        let response = router
            .storage
            .fetch(&req.resource, spec)?
            .unwrap_or_else(|| FetchKindResponse {
                kind: spec.kind,
                generation: 0,
                values: Vec::new(),
            });
        kind_responses.push(response);
    }
    debug!(
        resource_id = %req.resource,
        specifiers = req.specifiers.len(),
        "Served fetch"
    );
    Ok(MessageBody::FetchAns(FetchAnswer { kind_responses }))
}

fn local_credentials() -> (String, String) {
    (
        hex::encode(rand::random::<[u8; 4]>()),
        hex::encode(rand::random::<[u8; 16]>()),
    )
}

fn attach(router: &Router, req: &AttachRequest) -> AttachRequest {
    debug!(remote_candidates = req.candidates.len(), "Attach request");
    let (ufrag, password) = local_credentials();
    AttachRequest {
        ufrag,
        password,
        candidates: vec![router.config.local_address.clone()],
        send_update: false,
    }
}

fn app_attach(router: &Router, req: &AppAttachRequest) -> AppAttachRequest {
    debug!(application = req.application, "AppAttach request");
    let (ufrag, password) = local_credentials();
    AppAttachRequest {
        ufrag,
        password,
        application: req.application,
        candidates: vec![router.config.local_address.clone()],
    }
}
