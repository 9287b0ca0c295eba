//! # Router Service
//!
//! Processes forwarding headers, correlates answers with requests and
//! dispatches locally terminal requests to their handlers.
//!
//! ## Receive Path
//!
//! ```text
//! on_receive ──► loop check ──► overlay options? ──► classify
//!                                   │ no                │
//!                                   ▼                   ├─ InjectLocally ──► process
//!                                process                ├─ ForwardToGateway ─► gateway / relay
//!                                   │                   └─ Relay ──────────► relay
//!                                   ▼
//!                 destination list empty or resource owned?
//!                      │ yes                      │ no
//!                      ▼                          ▼
//!          answer ─► transaction table         relay (ttl, via list)
//!          request ─► access check ─► handler ─► reply
//! ```
//!
//! Sends are spawned onto the Tokio runtime and never block the receive path.

mod handlers;

use crate::domain::{
    classify, pop_own_heads, record_via, OverlayDecision, PeerState, RoutingConfig, RoutingError,
    TransactionTable,
};
use crate::ports::inbound::RoutingApi;
use crate::ports::outbound::{GatewayPort, PeerContact, Topology, Transport};
use async_trait::async_trait;
use parking_lot::RwLock;
use rl_01_storage::StorageApi;
use shared_types::security::sign_message;
use shared_types::{
    AccessController, Destination, ErrorAnswer, Message, MessageBody, NodeId, SecurityBlock,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Dependencies for `Router`.
pub struct RouterDependencies {
    pub storage: Arc<dyn StorageApi>,
    pub topology: Arc<dyn Topology>,
    pub transport: Arc<dyn Transport>,
    pub security: Arc<dyn SecurityBlock>,
    pub access: Arc<dyn AccessController>,
}

/// Where a message goes after its own entries are popped.
enum Route {
    Local,
    Forward(PeerContact),
    Unroutable(Destination),
}

/// The message router of one peer in one overlay.
pub struct Router {
    node_id: NodeId,
    config: RoutingConfig,
    storage: Arc<dyn StorageApi>,
    topology: Arc<dyn Topology>,
    transport: Arc<dyn Transport>,
    security: Arc<dyn SecurityBlock>,
    access: Arc<dyn AccessController>,
    gateway: RwLock<Option<Arc<dyn GatewayPort>>>,
    transactions: TransactionTable,
    state: RwLock<PeerState>,
}

impl Router {
    /// Create a router. The peer id is the security block's identity.
    pub fn new(config: RoutingConfig, deps: RouterDependencies) -> Self {
        Self {
            node_id: deps.security.identity(),
            config,
            storage: deps.storage,
            topology: deps.topology,
            transport: deps.transport,
            security: deps.security,
            access: deps.access,
            gateway: RwLock::new(None),
            transactions: TransactionTable::new(),
            state: RwLock::new(PeerState::Init),
        }
    }

    /// Router configuration.
    #[must_use]
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Outstanding requests.
    #[must_use]
    pub fn transactions(&self) -> &TransactionTable {
        &self.transactions
    }

    /// Attach the gateway that carries messages into other overlays.
    pub fn set_gateway(&self, gateway: Arc<dyn GatewayPort>) {
        *self.gateway.write() = Some(gateway);
    }

    /// Move to a new lifecycle state.
    pub fn set_state(&self, state: PeerState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            info!(node_id = %self.node_id, from = %previous, to = %state, "Peer state changed");
        }
    }

    /// Leave: suppress further sends and fail every waiting request.
    pub fn shutdown(&self) {
        self.set_state(PeerState::Exit);
        let cancelled = self.transactions.cancel_all();
        info!(node_id = %self.node_id, cancelled, "Router shut down");
    }

    /// Send `message` to `next_hop` asynchronously.
    ///
    /// Must be called within a Tokio runtime. Suppressed silently once the
    /// peer is exiting.
    ///
    /// # Errors
    ///
    /// `InvalidTarget` if the next hop has no identity.
    pub fn send(&self, message: Message, next_hop: PeerContact) -> Result<(), RoutingError> {
        let Some(target) = next_hop.node_id else {
            return Err(RoutingError::InvalidTarget(format!(
                "next hop {} has no node id",
                next_hop.address
            )));
        };
        if !self.state().can_send() {
            debug!(
                transaction_id = message.transaction_id(),
                "Send suppressed, peer is exiting"
            );
            return Ok(());
        }

        debug!(
            transaction_id = message.transaction_id(),
            code = message.body.code(),
            next_hop = %target,
            "Sending message"
        );
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let transaction_id = message.transaction_id();
            if let Err(err) = transport.send(message, next_hop).await {
                warn!(transaction_id, error = %err, "Transport send failed");
            }
        });
        Ok(())
    }

    // =========================================================================
    // RECEIVE PATH
    // =========================================================================

    fn handle_incoming(&self, message: Message) {
        let Some(options) = message.header.overlay_options.clone() else {
            self.process(message);
            return;
        };

        match classify(&self.config.overlay_name, &options) {
            OverlayDecision::InjectLocally => self.process(message),
            OverlayDecision::ForwardToGateway => {
                self.forward_to_gateway(message, &options.destination_overlay);
            }
            OverlayDecision::Relay => {
                debug!(
                    transaction_id = message.transaction_id(),
                    source_overlay = %options.source_overlay,
                    destination_overlay = %options.destination_overlay,
                    "Relaying foreign overlay traffic"
                );
                self.forward_foreign(message, &options.destination_overlay);
            }
        }
    }

    fn forward_to_gateway(&self, mut message: Message, destination_overlay: &str) {
        if message.next_destination() == Some(&Destination::Node(self.node_id)) {
            pop_own_heads(&mut message.header.destination_list, self.node_id);
            let gateway = self.gateway.read().clone();
            if let Some(gateway) = gateway {
                if message.header.destination_list.is_empty() || gateway.bridges(destination_overlay)
                {
                    debug!(
                        transaction_id = message.transaction_id(),
                        destination_overlay,
                        "Handing message to gateway"
                    );
                    gateway.receive(destination_overlay, message);
                    return;
                }
            }
        }
        self.forward_foreign(message, destination_overlay);
    }

    fn forward_foreign(&self, mut message: Message, destination_overlay: &str) {
        pop_own_heads(&mut message.header.destination_list, self.node_id);
        let Some(head) = message.next_destination().copied() else {
            let err = RoutingError::NoGateway(destination_overlay.to_string());
            self.reject(&message, err);
            return;
        };
        match self.topology.next_hop(&head) {
            Some(contact) => self.relay(message, contact),
            None => self.reject(&message, RoutingError::NoRoute(head)),
        }
    }

    fn resolve(&self, message: &mut Message) -> Route {
        pop_own_heads(&mut message.header.destination_list, self.node_id);
        match message.next_destination().copied() {
            None => Route::Local,
            Some(Destination::Resource(resource)) if self.topology.is_responsible(&resource) => {
                Route::Local
            }
            Some(head) => match self.topology.next_hop(&head) {
                Some(contact) => Route::Forward(contact),
                None => Route::Unroutable(head),
            },
        }
    }

    /// Same-overlay processing of a received message.
    fn process(&self, mut message: Message) {
        match self.resolve(&mut message) {
            Route::Local => self.deliver(message),
            Route::Forward(contact) => self.relay(message, contact),
            Route::Unroutable(head) => self.reject(&message, RoutingError::NoRoute(head)),
        }
    }

    fn relay(&self, mut message: Message, contact: PeerContact) {
        message.header.ttl = message.header.ttl.saturating_sub(1);
        if message.header.ttl == 0 {
            self.reject(&message, RoutingError::TtlExceeded);
            return;
        }
        record_via(&mut message.header.via_list, self.node_id);
        debug!(
            transaction_id = message.transaction_id(),
            ttl = message.header.ttl,
            next_hop = %contact,
            "Relaying message"
        );
        if let Err(err) = self.send(message, contact) {
            warn!(error = %err, "Relay failed");
        }
    }

    /// A message has reached its destination at this peer.
    fn deliver(&self, message: Message) {
        if !message.is_request() {
            self.transactions.complete(message);
            return;
        }

        if !self.access.request_permitted(&message) {
            warn!(
                transaction_id = message.transaction_id(),
                originator = %message.originator,
                code = message.body.code(),
                "Request not permitted"
            );
            let err = RoutingError::AccessDenied(format!(
                "request from {} not permitted",
                message.originator
            ));
            self.reject(&message, err);
            return;
        }

        match handlers::handle_request(self, &message) {
            Ok(body) => self.reply(&message, body),
            Err(err) => {
                if matches!(err, RoutingError::ProtocolViolation { .. }) {
                    error!(
                        transaction_id = message.transaction_id(),
                        originator = %message.originator,
                        error = %err,
                        "Protocol violation"
                    );
                }
                self.reject(&message, err);
            }
        }
    }

    /// Answer a request with an `Error`; drop an answer.
    fn reject(&self, message: &Message, err: RoutingError) {
        if message.is_request() {
            warn!(
                transaction_id = message.transaction_id(),
                error = %err,
                "Rejecting request"
            );
            let body = MessageBody::Error(ErrorAnswer::new(err.error_code(), err.to_string()));
            self.reply(message, body);
        } else {
            warn!(
                transaction_id = message.transaction_id(),
                error = %err,
                "Dropping answer"
            );
        }
    }

    fn reply(&self, request: &Message, body: MessageBody) {
        let mut answer =
            Message::answer_to(request, self.node_id, body).with_ttl(self.config.initial_ttl);
        if let Err(err) = self.sign(&mut answer) {
            warn!(error = %err, "Could not sign answer");
            return;
        }
        if let Err(err) = self.submit(answer) {
            warn!(
                transaction_id = request.transaction_id(),
                error = %err,
                "Could not send answer"
            );
        }
    }
}

#[async_trait]
impl RoutingApi for Router {
    fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn overlay_name(&self) -> &str {
        &self.config.overlay_name
    }

    fn state(&self) -> PeerState {
        *self.state.read()
    }

    fn create_message(
        &self,
        destination: Destination,
        body: MessageBody,
    ) -> Result<Message, RoutingError> {
        let mut message = Message::request(
            self.node_id,
            self.transactions.next_id(),
            vec![destination],
            body,
        )
        .with_ttl(self.config.initial_ttl);
        self.sign(&mut message)?;
        Ok(message)
    }

    fn sign(&self, message: &mut Message) -> Result<(), RoutingError> {
        sign_message(self.security.as_ref(), message)?;
        Ok(())
    }

    fn on_receive(&self, message: Message) {
        if !self.state().can_send() {
            debug!(
                transaction_id = message.transaction_id(),
                "Dropping message, peer is exiting"
            );
            return;
        }
        if message
            .header
            .via_list
            .contains(&Destination::Node(self.node_id))
        {
            warn!(
                transaction_id = message.transaction_id(),
                originator = %message.originator,
                "Dropping looping message"
            );
            return;
        }
        self.handle_incoming(message);
    }

    fn inject(&self, message: Message) {
        if !self.state().can_send() {
            return;
        }
        self.handle_incoming(message);
    }

    fn submit(&self, mut message: Message) -> Result<(), RoutingError> {
        // Traffic bound for another overlay takes the gateway path; failures
        // there come back as an `Error` answer rather than an `Err`.
        if let Some(options) = &message.header.overlay_options {
            if classify(&self.config.overlay_name, options) != OverlayDecision::InjectLocally {
                self.handle_incoming(message);
                return Ok(());
            }
        }
        match self.resolve(&mut message) {
            Route::Local => {
                self.deliver(message);
                Ok(())
            }
            Route::Forward(contact) => self.send(message, contact),
            Route::Unroutable(head) => Err(RoutingError::NoRoute(head)),
        }
    }

    async fn request(
        &self,
        destination: Destination,
        body: MessageBody,
    ) -> Result<MessageBody, RoutingError> {
        let message = self.create_message(destination, body)?;
        self.request_message(message).await
    }

    async fn request_message(&self, message: Message) -> Result<MessageBody, RoutingError> {
        if !self.state().can_send() {
            return Err(RoutingError::ShuttingDown);
        }
        let transaction_id = message.transaction_id();
        let receiver = self
            .transactions
            .register(transaction_id, message.body.code());

        if let Err(err) = self.submit(message) {
            self.transactions.cancel(transaction_id);
            return Err(err);
        }

        match tokio::time::timeout(self.config.request_timeout, receiver).await {
            Ok(Ok(answer)) => match answer.body {
                MessageBody::Error(ErrorAnswer { code, reason }) => {
                    debug!(transaction_id, %code, "Request answered with error");
                    Err(RoutingError::Remote { code, reason })
                }
                body => Ok(body),
            },
            Ok(Err(_)) => Err(RoutingError::ShuttingDown),
            Err(_) => {
                self.transactions.cancel(transaction_id);
                warn!(
                    transaction_id,
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "Request timed out"
                );
                Err(RoutingError::Timeout { transaction_id })
            }
        }
    }
}
