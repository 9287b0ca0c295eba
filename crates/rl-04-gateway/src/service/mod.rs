//! # Gateway Relay
//!
//! Carries traffic between overlays. A namespace (the name of the other
//! overlay) is resolved to the node id of a gateway through the service
//! resolver; until the lookup finishes, requests for that namespace wait in
//! a per-namespace queue. Only the first queued request starts a lookup.


use crate::domain::{GatewayConfig, GatewayError, GatewayOutcome, GatewayRequest};
use crate::ports::outbound::{OverlayMessenger, ServiceResolver};
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, OverlayEvent};
use shared_types::{
    AppAttachRequest, Destination, ErrorAnswer, FetchAnswer, FetchRequest, Message, MessageBody,
    NodeId,
    OverlayForwardingOptions, ResourceId, StoreAnswer, StoreKindData, StoreRequest,
    StoredDataSpecifier,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Cache and queues, guarded together so a request is either fired from the
/// cache or queued before the lookup drains the queue.
#[derive(Default)]
struct RelayState {
    gateways: HashMap<String, NodeId>,
    pending: HashMap<String, VecDeque<GatewayRequest>>,
}

/// Relay between this peer's overlay and others.
pub struct GatewayRelay {
    config: GatewayConfig,
    messenger: Arc<dyn OverlayMessenger>,
    resolver: Arc<dyn ServiceResolver>,
    events: Arc<dyn EventPublisher>,
    state: Mutex<RelayState>,
    /// Relays of other overlays hosted by this same process.
    bridges: RwLock<HashMap<String, Weak<GatewayRelay>>>,
    lookups_started: AtomicU64,
}

impl GatewayRelay {
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        messenger: Arc<dyn OverlayMessenger>,
        resolver: Arc<dyn ServiceResolver>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            messenger,
            resolver,
            events,
            state: Mutex::new(RelayState::default()),
            bridges: RwLock::new(HashMap::new()),
            lookups_started: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn overlay_name(&self) -> &str {
        &self.config.overlay_name
    }

    /// Number of namespace lookups started so far.
    #[must_use]
    pub fn lookups_started(&self) -> u64 {
        self.lookups_started.load(Ordering::Relaxed)
    }

    /// Gateway cached for `namespace`, if resolved.
    #[must_use]
    pub fn cached_gateway(&self, namespace: &str) -> Option<NodeId> {
        self.state.lock().gateways.get(namespace).copied()
    }

    /// Requests waiting for `namespace` to resolve.
    #[must_use]
    pub fn queued(&self, namespace: &str) -> usize {
        self.state
            .lock()
            .pending
            .get(namespace)
            .map_or(0, VecDeque::len)
    }

    /// Drop a cached gateway so the next request looks it up again.
    pub fn forget(&self, namespace: &str) {
        self.state.lock().gateways.remove(namespace);
    }

    /// Connect `relay`, serving another overlay in this process, as a bridge.
    pub fn connect_bridge(&self, relay: &Arc<GatewayRelay>) {
        let overlay = relay.overlay_name().to_string();
        info!(from = %self.config.overlay_name, to = %overlay, "Bridge connected");
        self.bridges.write().insert(overlay, Arc::downgrade(relay));
    }

    /// Whether messages for `overlay` can be handed over in-process.
    #[must_use]
    pub fn bridges(&self, overlay: &str) -> bool {
        self.bridge(overlay).is_some()
    }

    fn bridge(&self, overlay: &str) -> Option<Arc<GatewayRelay>> {
        self.bridges.read().get(overlay).and_then(Weak::upgrade)
    }

    // =========================================================================
    // QUEUEING
    // =========================================================================

    /// Fire `request` at the cached gateway, or queue it behind a lookup.
    ///
    /// # Errors
    ///
    /// `QueueFull` when the namespace already has the maximum waiting.
    pub fn enqueue(
        self: &Arc<Self>,
        namespace: &str,
        request: GatewayRequest,
    ) -> Result<(), GatewayError> {
        let start_lookup = {
            let mut state = self.state.lock();
            let cached = state.gateways.get(namespace).copied();
            if let Some(gateway) = cached {
                drop(state);
                self.fire(namespace, gateway, request);
                return Ok(());
            }
            let queue = state.pending.entry(namespace.to_string()).or_default();
            if queue.len() >= self.config.max_queued_per_namespace {
                return Err(GatewayError::QueueFull {
                    namespace: namespace.to_string(),
                    limit: self.config.max_queued_per_namespace,
                });
            }
            queue.push_back(request);
            queue.len() == 1
        };

        if start_lookup {
            self.spawn_lookup(namespace.to_string());
        } else {
            debug!(namespace, "Request queued behind running lookup");
        }
        Ok(())
    }

    fn spawn_lookup(self: &Arc<Self>, namespace: String) {
        self.lookups_started.fetch_add(1, Ordering::Relaxed);
        debug!(namespace = %namespace, "Resolving gateway");
        let relay = Arc::clone(self);
        tokio::spawn(async move {
            match relay.resolver.resolve(&namespace).await {
                Ok(gateway) => relay.on_lookup_completed(&namespace, gateway),
                Err(err) => relay.on_lookup_failed(&namespace, &err),
            }
        });
    }

    fn on_lookup_completed(self: &Arc<Self>, namespace: &str, gateway: NodeId) {
        let drained = {
            let mut state = self.state.lock();
            state.gateways.insert(namespace.to_string(), gateway);
            state.pending.remove(namespace).unwrap_or_default()
        };
        info!(namespace, gateway = %gateway, released = drained.len(), "Gateway resolved");
        for request in drained {
            self.fire(namespace, gateway, request);
        }
    }

    fn on_lookup_failed(&self, namespace: &str, err: &GatewayError) {
        let drained = self
            .state
            .lock()
            .pending
            .remove(namespace)
            .unwrap_or_default();
        warn!(namespace, error = %err, failed = drained.len(), "Gateway lookup failed");
        let failure = match err {
            GatewayError::LookupFailed { .. } => err.clone(),
            other => GatewayError::LookupFailed {
                namespace: namespace.to_string(),
                reason: other.to_string(),
            },
        };
        let reason = err.to_string();
        for request in drained {
            self.report_failure(namespace, request.kind(), &reason);
            if let Some(message) = request.fail(failure.clone()) {
                self.reject(&message, &failure);
            }
        }
    }

    /// Answer a relayed request that could not be carried on with an
    /// `Error`, so its originator does not wait for a timeout. Answers are
    /// dropped.
    pub fn reject(&self, message: &Message, err: &GatewayError) {
        if !message.is_request() {
            debug!(tx = message.transaction_id(), error = %err, "Dropping undeliverable answer");
            return;
        }
        let error = ErrorAnswer::new(err.error_code(), err.to_string());
        if let Err(send_err) = self.messenger.reject(message, error) {
            warn!(
                tx = message.transaction_id(),
                originator = %message.originator,
                error = %send_err,
                "Could not answer failed relay"
            );
        }
    }

    fn report_failure(&self, namespace: &str, request: &'static str, reason: &str) {
        self.events.publish(OverlayEvent::GatewayRequestFailed {
            namespace: namespace.to_string(),
            request,
            reason: reason.to_string(),
        });
    }

    // =========================================================================
    // FIRING
    // =========================================================================

    fn fire(self: &Arc<Self>, namespace: &str, gateway: NodeId, request: GatewayRequest) {
        match request {
            GatewayRequest::Forward { message } => {
                let request = message.is_request().then(|| message.clone());
                if let Err(err) = self.forward_to(namespace, gateway, message) {
                    warn!(namespace, error = %err, "Forward through gateway failed");
                    self.report_failure(namespace, "forward", &err.to_string());
                    if let Some(request) = request {
                        self.reject(&request, &err);
                    }
                }
            }
            GatewayRequest::Fetch {
                resource,
                specifiers,
                reply,
            } => {
                let body = MessageBody::FetchReq(FetchRequest {
                    resource,
                    specifiers,
                });
                self.spawn_request(
                    namespace,
                    gateway,
                    Destination::Resource(resource),
                    body,
                    reply,
                    |body| match body {
                        MessageBody::FetchAns(answer) => Ok(answer),
                        other => Err(other),
                    },
                );
            }
            GatewayRequest::Store {
                resource,
                kind_data,
                reply,
            } => {
                let body = MessageBody::StoreReq(StoreRequest {
                    resource,
                    replica_number: 0,
                    kind_data,
                });
                self.spawn_request(
                    namespace,
                    gateway,
                    Destination::Resource(resource),
                    body,
                    reply,
                    |body| match body {
                        MessageBody::StoreAns(answer) => Ok(answer),
                        other => Err(other),
                    },
                );
            }
            GatewayRequest::AppAttach {
                target,
                request,
                reply,
            } => {
                let body = MessageBody::AppAttachReq(request);
                self.spawn_request(
                    namespace,
                    gateway,
                    Destination::Node(target),
                    body,
                    reply,
                    |body| match body {
                        MessageBody::AppAttachAns(answer) => Ok(answer),
                        other => Err(other),
                    },
                );
            }
        }
    }

    fn forward_to(
        &self,
        namespace: &str,
        gateway: NodeId,
        mut message: Message,
    ) -> Result<(), GatewayError> {
        let head = Destination::Node(gateway);
        if message.next_destination() != Some(&head) {
            message.header.destination_list.insert(0, head);
        }
        if message.header.overlay_options.is_none() {
            message.header.overlay_options = Some(OverlayForwardingOptions::new(
                self.config.overlay_name.clone(),
                namespace,
            ));
        }
        debug!(
            namespace,
            gateway = %gateway,
            tx = message.transaction_id(),
            "Forwarding through gateway"
        );
        self.messenger.submit(message)
    }

    fn spawn_request<T, F>(
        &self,
        namespace: &str,
        gateway: NodeId,
        target: Destination,
        body: MessageBody,
        reply: oneshot::Sender<Result<T, GatewayError>>,
        extract: F,
    ) where
        T: Send + 'static,
        F: FnOnce(MessageBody) -> Result<T, MessageBody> + Send + 'static,
    {
        let message = self
            .messenger
            .create_message(Destination::Node(gateway), body)
            .map(|mut message| {
                message.header.destination_list.push(target);
                message.with_overlay_options(OverlayForwardingOptions::new(
                    self.config.overlay_name.clone(),
                    namespace,
                ))
            });
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };
        // The signature covers the body, not the header, so the
        // destination list can still change after signing.
        let messenger = Arc::clone(&self.messenger);
        tokio::spawn(async move {
            let result = match messenger.request(message).await {
                Ok(MessageBody::Error(error)) => Err(GatewayError::Remote {
                    code: error.code,
                    reason: error.reason,
                }),
                Ok(body) => {
                    extract(body).map_err(|other| GatewayError::UnexpectedAnswer(other.code()))
                }
                Err(err) => Err(err),
            };
            let _ = reply.send(result);
        });
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Fetch from `resource` in the overlay named `namespace`.
    ///
    /// # Errors
    ///
    /// `LookupFailed` when no gateway serves the namespace, or any error of
    /// the request itself.
    pub async fn fetch_via(
        self: &Arc<Self>,
        namespace: &str,
        resource: ResourceId,
        specifiers: Vec<StoredDataSpecifier>,
    ) -> Result<FetchAnswer, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(
            namespace,
            GatewayRequest::Fetch {
                resource,
                specifiers,
                reply,
            },
        )?;
        rx.await.map_err(|_| GatewayError::Cancelled)?
    }

    /// Store into `resource` in the overlay named `namespace`.
    ///
    /// # Errors
    ///
    /// As for [`GatewayRelay::fetch_via`].
    pub async fn store_via(
        self: &Arc<Self>,
        namespace: &str,
        resource: ResourceId,
        kind_data: Vec<StoreKindData>,
    ) -> Result<StoreAnswer, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(
            namespace,
            GatewayRequest::Store {
                resource,
                kind_data,
                reply,
            },
        )?;
        rx.await.map_err(|_| GatewayError::Cancelled)?
    }

    /// Open an application connection to `target` in the overlay named
    /// `namespace`.
    ///
    /// # Errors
    ///
    /// As for [`GatewayRelay::fetch_via`].
    pub async fn app_attach_via(
        self: &Arc<Self>,
        namespace: &str,
        target: NodeId,
        request: AppAttachRequest,
    ) -> Result<AppAttachRequest, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(
            namespace,
            GatewayRequest::AppAttach {
                target,
                request,
                reply,
            },
        )?;
        rx.await.map_err(|_| GatewayError::Cancelled)?
    }

    /// Send `message` on toward the gateway serving `namespace`.
    ///
    /// The message is re-signed by this peer before it leaves.
    ///
    /// # Errors
    ///
    /// Signing errors and `QueueFull`. Lookup failures are reported as
    /// `GatewayRequestFailed` events and, for requests, answered to the
    /// originator with an `Error`.
    pub fn forward_via(
        self: &Arc<Self>,
        namespace: &str,
        mut message: Message,
    ) -> Result<(), GatewayError> {
        self.messenger.sign(&mut message)?;
        self.enqueue(namespace, GatewayRequest::Forward { message })
    }

    /// Take over a message addressed to `destination_overlay`.
    ///
    /// Messages for this relay's own overlay are re-signed, recorded in
    /// the via list and handed to the local router. Messages for an overlay
    /// bridged in this process go to that overlay's relay; anything else is
    /// forwarded toward the namespace's gateway.
    ///
    /// # Errors
    ///
    /// As for [`GatewayRelay::forward_via`].
    pub fn receive(
        self: &Arc<Self>,
        destination_overlay: &str,
        mut message: Message,
    ) -> Result<GatewayOutcome, GatewayError> {
        if destination_overlay == self.config.overlay_name {
            self.messenger.sign(&mut message)?;
            let own = Destination::Node(self.messenger.local_node_id());
            if message.header.via_list.last() != Some(&own) {
                message.header.via_list.push(own);
            }
            debug!(
                overlay = %self.config.overlay_name,
                tx = message.transaction_id(),
                "Message entered overlay"
            );
            self.messenger.deliver_local(message);
            return Ok(GatewayOutcome::DestinationReached);
        }

        if let Some(bridge) = self.bridge(destination_overlay) {
            return bridge.receive(destination_overlay, message);
        }

        self.forward_via(destination_overlay, message)?;
        Ok(GatewayOutcome::Relayed)
    }
}
