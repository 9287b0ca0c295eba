//! # Overlay Peer
//!
//! Composition root of one peer in one overlay: builds the storage engine,
//! router, ReDiR service and gateway relay, attaches the peer to the
//! in-memory network and runs its receive loop, expiry sweep and, for
//! gateways, the refresh of their ReDiR records.
//!
//! ## Startup Sequence
//!
//! 1. Attach an inbox at the peer's address
//! 2. Build components bottom-up (storage, router, ReDiR, gateway)
//! 3. Enter the ring (`Joining` -> `Joined`)
//! 4. Spawn the receive loop, the sweep timer and the record refresh

use crate::adapters::{
    InMemoryNetwork, Inbox, RedirResolver, RelayGatewayPort, RingMembership, RouterDhtClient,
    RouterMessenger, StaticRingTopology,
};
use crate::config::PeerConfig;
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use rl_01_storage::{StorageDependencies, StorageEngine, SystemTimeSource};
use rl_02_routing::{PeerState, Router, RouterDependencies, RoutingApi, RoutingError};
use rl_03_redir::{RedirApi, RedirError, RedirService, Registration};
use rl_04_gateway::{GatewayError, GatewayRelay};
use shared_bus::InMemoryEventBus;
use shared_types::codec::decode_message;
use shared_types::{
    Destination, FetchAnswer, FetchRequest, HmacAccessController, HmacSecurityBlock,
    MessageBody, NodeId, ResourceId, StaticKindRegistry, StoreAnswer,
    StoreKindData, StoreRequest, StoredDataSpecifier,
};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Floor for the sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// One running peer.
pub struct OverlayPeer {
    config: PeerConfig,
    address: String,
    network: Arc<InMemoryNetwork>,
    ring: Arc<RingMembership>,
    events: Arc<InMemoryEventBus>,
    storage: Arc<StorageEngine>,
    router: Arc<Router>,
    redir: Arc<RedirService>,
    gateway: Arc<GatewayRelay>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl OverlayPeer {
    /// Build and start a peer on `network`.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the peer's address is already attached or the ReDiR
    /// configuration is invalid.
    pub fn start(config: PeerConfig, network: &Arc<InMemoryNetwork>) -> Result<Arc<Self>> {
        let address = InMemoryNetwork::address_of(&config.overlay, &config.node_id);
        let inbox = network
            .attach(&address)
            .ok_or_else(|| anyhow!("address {address} already in use"))?;

        Self::build(config, address.clone(), network, inbox).inspect_err(|_| {
            network.detach(&address);
        })
    }

    fn build(
        config: PeerConfig,
        address: String,
        network: &Arc<InMemoryNetwork>,
        inbox: Inbox,
    ) -> Result<Arc<Self>> {
        let node_id = config.node_id;
        let registry: Arc<StaticKindRegistry> = Arc::new(StaticKindRegistry::with_base_kinds());
        let security = Arc::new(HmacSecurityBlock::new(node_id, config.shared_key.clone()));
        let access = Arc::new(HmacAccessController::new(Arc::clone(&security)));
        let events = Arc::new(InMemoryEventBus::new());

        // Storage
        let storage = Arc::new(StorageEngine::new(
            StorageDependencies {
                registry: registry.clone(),
                access: access.clone(),
                signer: security.clone(),
                events: events.clone(),
                time_source: Arc::new(SystemTimeSource),
            },
            config.storage.clone(),
        ));

        // Routing
        let ring = network.ring(&config.overlay);
        let routing = rl_02_routing::RoutingConfig {
            local_address: address.clone(),
            ..config.routing.clone()
        };
        let router = Arc::new(Router::new(
            routing,
            RouterDependencies {
                storage: storage.clone(),
                topology: Arc::new(StaticRingTopology::new(node_id, Arc::clone(&ring))),
                transport: network.clone(),
                security,
                access,
            },
        ));

        // ReDiR
        let redir = Arc::new(
            RedirService::new(
                node_id,
                config.redir.clone(),
                Arc::new(RouterDhtClient::new(router.clone())),
                events.clone(),
            )
            .context("invalid redir configuration")?,
        );

        // Gateway
        let gateway = Arc::new(GatewayRelay::new(
            config.gateway.clone(),
            Arc::new(RouterMessenger::new(router.clone())),
            Arc::new(RedirResolver::new(redir.clone())),
            events.clone(),
        ));
        router.set_gateway(Arc::new(RelayGatewayPort::new(&gateway)));

        router.set_state(PeerState::Joining);
        ring.insert(node_id, address.clone());
        router.set_state(PeerState::Joined);

        let peer = Arc::new(Self {
            config,
            address,
            network: network.clone(),
            ring,
            events,
            storage,
            router,
            redir,
            gateway,
            tasks: Mutex::new(Vec::new()),
        });

        let receive = peer.spawn_receive_loop(inbox, registry);
        let sweep = peer.spawn_sweep();
        peer.tasks.lock().extend([receive, sweep]);
        if !peer.config.serves.is_empty() {
            let refresh = peer.spawn_refresh();
            peer.tasks.lock().push(refresh);
        }

        info!(
            node_id = %node_id,
            overlay = %peer.config.overlay,
            address = %peer.address,
            "Peer started"
        );
        Ok(peer)
    }

    fn spawn_receive_loop(
        &self,
        mut inbox: Inbox,
        registry: Arc<StaticKindRegistry>,
    ) -> JoinHandle<()> {
        let router = Arc::downgrade(&self.router);
        tokio::spawn(async move {
            while let Some(bytes) = inbox.recv().await {
                let Some(router) = router.upgrade() else {
                    break;
                };
                match decode_message(&bytes, registry.as_ref()) {
                    Ok(message) => router.on_receive(message),
                    Err(err) => {
                        warn!(error = %err, bytes = bytes.len(), "Undecodable frame dropped");
                    }
                }
            }
        })
    }

    fn spawn_sweep(&self) -> JoinHandle<()> {
        let storage: Weak<StorageEngine> = Arc::downgrade(&self.storage);
        let period = self.config.storage.sweep_interval.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(storage) = storage.upgrade() else {
                    break;
                };
                let evicted = storage.sweep_expired_now();
                if evicted > 0 {
                    debug!(evicted, "Expiry sweep");
                }
            }
        })
    }

    /// Re-register every served namespace before its records expire.
    ///
    /// The first registration is left to [`OverlayPeer::announce`].
    fn spawn_refresh(&self) -> JoinHandle<()> {
        let redir: Weak<RedirService> = Arc::downgrade(&self.redir);
        let serves = self.config.serves.clone();
        let period = self.config.redir.refresh_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(redir) = redir.upgrade() else {
                    break;
                };
                for namespace in &serves {
                    match redir.register(namespace).await {
                        Ok(_) => debug!(namespace = %namespace, "Registration refreshed"),
                        Err(err) => {
                            warn!(namespace = %namespace, error = %err, "Registration refresh failed");
                        }
                    }
                }
            }
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.config.node_id
    }

    #[must_use]
    pub fn overlay(&self) -> &str {
        &self.config.overlay
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    #[must_use]
    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.events
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn redir(&self) -> &Arc<RedirService> {
        &self.redir
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<GatewayRelay> {
        &self.gateway
    }

    #[must_use]
    pub fn state(&self) -> PeerState {
        self.router.state()
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Store into the peer responsible for `resource`.
    ///
    /// # Errors
    ///
    /// Any routing error, including `Remote` for a rejected store.
    pub async fn store(
        &self,
        resource: ResourceId,
        kind_data: Vec<StoreKindData>,
    ) -> Result<StoreAnswer, RoutingError> {
        let body = MessageBody::StoreReq(StoreRequest {
            resource,
            replica_number: 0,
            kind_data,
        });
        match self
            .router
            .request(Destination::Resource(resource), body)
            .await?
        {
            MessageBody::StoreAns(answer) => Ok(answer),
            other => Err(RoutingError::UnexpectedAnswer {
                expected: "StoreAns",
                actual: other.code(),
            }),
        }
    }

    /// Fetch from the peer responsible for `resource`.
    ///
    /// # Errors
    ///
    /// Any routing error.
    pub async fn fetch(
        &self,
        resource: ResourceId,
        specifiers: Vec<StoredDataSpecifier>,
    ) -> Result<FetchAnswer, RoutingError> {
        let body = MessageBody::FetchReq(FetchRequest {
            resource,
            specifiers,
        });
        match self
            .router
            .request(Destination::Resource(resource), body)
            .await?
        {
            MessageBody::FetchAns(answer) => Ok(answer),
            other => Err(RoutingError::UnexpectedAnswer {
                expected: "FetchAns",
                actual: other.code(),
            }),
        }
    }

    /// Fetch from `resource` in another overlay through its gateway.
    ///
    /// # Errors
    ///
    /// As for [`GatewayRelay::fetch_via`].
    pub async fn fetch_in(
        &self,
        overlay: &str,
        resource: ResourceId,
        specifiers: Vec<StoredDataSpecifier>,
    ) -> Result<FetchAnswer, GatewayError> {
        self.gateway.fetch_via(overlay, resource, specifiers).await
    }

    /// Store into `resource` in another overlay through its gateway.
    ///
    /// # Errors
    ///
    /// As for [`GatewayRelay::store_via`].
    pub async fn store_in(
        &self,
        overlay: &str,
        resource: ResourceId,
        kind_data: Vec<StoreKindData>,
    ) -> Result<StoreAnswer, GatewayError> {
        self.gateway.store_via(overlay, resource, kind_data).await
    }

    /// Register every namespace this peer serves with ReDiR.
    ///
    /// # Errors
    ///
    /// The first registration that fails.
    pub async fn announce(&self) -> Result<Vec<Registration>, RedirError> {
        let mut registrations = Vec::with_capacity(self.config.serves.len());
        for namespace in &self.config.serves {
            let registration = self.redir.register(namespace).await?;
            info!(
                namespace = %namespace,
                levels = ?registration.levels,
                "Gateway announced"
            );
            registrations.push(registration);
        }
        Ok(registrations)
    }

    /// Join this peer's gateway with `other`'s so traffic crosses in-process.
    ///
    /// Both peers must run in the same process and serve each other's
    /// overlay.
    pub fn bridge(&self, other: &OverlayPeer) {
        self.gateway.connect_bridge(&other.gateway);
        other.gateway.connect_bridge(&self.gateway);
    }

    /// Leave the overlay: fail waiting requests, stop receiving, stop tasks.
    pub fn shutdown(&self) {
        self.router.shutdown();
        self.ring.remove(&self.config.node_id);
        self.network.detach(&self.address);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!(node_id = %self.config.node_id, overlay = %self.config.overlay, "Peer stopped");
    }
}

impl Drop for OverlayPeer {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
