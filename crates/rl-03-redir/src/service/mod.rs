//! # ReDiR Service
//!
//! Stateless driver: every `register` and `lookup` call builds its own
//! operation object and runs it to completion against the DHT, so any number
//! of them may be in flight at once.


use crate::domain::{
    all_registrants, bucket_resource, parse_registrants, provider_record, BucketRef,
    LookupOperation, LookupStep, RedirConfig, RedirError, RegisterOperation,
};
use crate::ports::inbound::{RedirApi, Registration};
use crate::ports::outbound::DhtClient;
use async_trait::async_trait;
use shared_bus::{EventPublisher, OverlayEvent};
use shared_types::NodeId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// ReDiR registration and lookup over a DHT.
pub struct RedirService {
    node_id: NodeId,
    config: RedirConfig,
    dht: Arc<dyn DhtClient>,
    events: Arc<dyn EventPublisher>,
}

impl RedirService {
    /// Create a service for the peer `node_id`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the level bounds are out of range.
    pub fn new(
        node_id: NodeId,
        config: RedirConfig,
        dht: Arc<dyn DhtClient>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Self, RedirError> {
        config.validate()?;
        Ok(Self {
            node_id,
            config,
            dht,
            events,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RedirConfig {
        &self.config
    }

    async fn fetch_bucket(&self, namespace: &str, bucket: BucketRef) -> Result<Vec<NodeId>, RedirError> {
        let resource = bucket_resource(namespace, bucket.level, bucket.index);
        let values = self.dht.fetch(resource, all_registrants()).await?;
        let registrants = parse_registrants(namespace, &values)?;
        debug!(
            namespace,
            level = bucket.level,
            index = bucket.index,
            registrants = registrants.len(),
            "Fetched bucket"
        );
        Ok(registrants)
    }

    async fn store_record(&self, namespace: &str, bucket: BucketRef) -> Result<(), RedirError> {
        let resource = bucket_resource(namespace, bucket.level, bucket.index);
        let record = provider_record(
            self.node_id,
            namespace,
            shared_types::now_millis(),
            self.config.record_lifetime_secs(),
        );
        self.dht.store(resource, record).await?;
        debug!(
            namespace,
            level = bucket.level,
            index = bucket.index,
            "Stored provider record"
        );
        Ok(())
    }

    async fn run_lookup(&self, op: &mut LookupOperation) -> Result<NodeId, RedirError> {
        loop {
            let bucket = op.current_bucket();
            let registrants = self.fetch_bucket(op.namespace(), bucket).await?;
            match op.on_fetched(&registrants) {
                LookupStep::Fetch(next) => {
                    debug!(
                        namespace = op.namespace(),
                        from = bucket.level,
                        to = next.level,
                        "Lookup moving level"
                    );
                }
                LookupStep::Resolved(node_id) => return Ok(node_id),
                LookupStep::Failed => {
                    return Err(RedirError::LookupFailed {
                        namespace: op.namespace().to_string(),
                        key: op.key(),
                    })
                }
            }
        }
    }
}

#[async_trait]
impl RedirApi for RedirService {
    async fn register(&self, namespace: &str) -> Result<Registration, RedirError> {
        let mut op = RegisterOperation::new(namespace, self.node_id, &self.config);
        loop {
            let bucket = op.current_bucket();
            let registrants = self.fetch_bucket(namespace, bucket).await?;
            let step = op.on_fetched(&registrants);
            if let Some(target) = step.store {
                self.store_record(namespace, target).await?;
            }
            if step.done {
                break;
            }
            debug!(namespace, level = op.level(), status = %op.status(), "Registration step");
        }

        let levels = op.stored_levels().to_vec();
        info!(namespace, node_id = %self.node_id, levels = ?levels, "Registered with ReDiR");
        self.events.publish(OverlayEvent::RegistrationCompleted {
            namespace: namespace.to_string(),
            node_id: self.node_id,
            levels: levels.clone(),
        });
        Ok(Registration {
            namespace: namespace.to_string(),
            node_id: self.node_id,
            levels,
        })
    }

    async fn lookup(&self, namespace: &str) -> Result<NodeId, RedirError> {
        self.lookup_key(namespace, self.node_id).await
    }

    async fn lookup_key(&self, namespace: &str, key: NodeId) -> Result<NodeId, RedirError> {
        let mut op = LookupOperation::new(namespace, key, &self.config);
        match self.run_lookup(&mut op).await {
            Ok(node_id) => {
                info!(namespace, key = %key, node_id = %node_id, levels = ?op.visited_levels(), "Lookup resolved");
                self.events.publish(OverlayEvent::LookupCompleted {
                    namespace: namespace.to_string(),
                    key,
                    node_id,
                });
                Ok(node_id)
            }
            Err(err) => {
                warn!(namespace, key = %key, error = %err, "Lookup failed");
                self.events.publish(OverlayEvent::LookupFailed {
                    namespace: namespace.to_string(),
                    key,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }
}
