//! # Storage Engine Service
//!
//! Holds every resource this peer is responsible for and implements
//! `StorageApi`.
//!
//! ## Concurrency
//!
//! The resource table is behind a `RwLock`; each resource has its own
//! `Mutex`, so writers to different resources never contend. Lock order is
//! always table then resource. Writers hold the table read guard while they
//! hold the resource lock, so the sweep (which drops empty resources under
//! the table write guard) can never detach a resource mid-write.

#[cfg(test)]
mod tests;

use crate::domain::config::StorageConfig;
use crate::domain::errors::StorageError;
use crate::domain::resource::ResourceStore;
use crate::ports::inbound::StorageApi;
use crate::ports::outbound::TimeSource;
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, OverlayEvent};
use shared_types::security::sign_stored_data;
use shared_types::{
    AccessController, DataModel, FetchKindResponse, KindId, KindRegistry, ResourceId,
    SecurityBlock, StoreKindData, StoreKindResponse, StoredDataSpecifier, Timestamp,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dependencies for `StorageEngine`.
pub struct StorageDependencies {
    pub registry: Arc<dyn KindRegistry>,
    pub access: Arc<dyn AccessController>,
    pub signer: Arc<dyn SecurityBlock>,
    pub events: Arc<dyn EventPublisher>,
    pub time_source: Arc<dyn TimeSource>,
}

/// The storage engine.
pub struct StorageEngine {
    resources: RwLock<HashMap<ResourceId, Arc<Mutex<ResourceStore>>>>,
    registry: Arc<dyn KindRegistry>,
    access: Arc<dyn AccessController>,
    signer: Arc<dyn SecurityBlock>,
    events: Arc<dyn EventPublisher>,
    time_source: Arc<dyn TimeSource>,
    config: StorageConfig,
}

impl StorageEngine {
    /// Create an empty engine.
    pub fn new(deps: StorageDependencies, config: StorageConfig) -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
            registry: deps.registry,
            access: deps.access,
            signer: deps.signer,
            events: deps.events,
            time_source: deps.time_source,
            config,
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Number of resources held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Whether no resource is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the expiry sweep against the engine's clock.
    pub fn sweep_expired_now(&self) -> usize {
        self.sweep_expired(self.time_source.now_millis())
    }

    fn resource(&self, id: &ResourceId) -> Option<Arc<Mutex<ResourceStore>>> {
        self.resources.read().get(id).cloned()
    }

    /// Run `apply` on the live store of `id`, creating the resource if absent.
    fn with_resource_mut<R>(
        &self,
        id: ResourceId,
        apply: impl FnOnce(&mut ResourceStore) -> R,
    ) -> R {
        loop {
            let table = self.resources.read();
            if let Some(entry) = table.get(&id) {
                return apply(&mut entry.lock());
            }
            drop(table);
            // The sweep may drop this empty resource before the next read;
            // the loop then creates it again.
            self.resources
                .write()
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(ResourceStore::new())));
        }
    }

    /// Resolve each kind's model and check every value before any write.
    fn validate(
        &self,
        resource: &ResourceId,
        kind_data: &[StoreKindData],
    ) -> Result<Vec<DataModel>, StorageError> {
        kind_data
            .iter()
            .map(|kd| {
                let model = self
                    .registry
                    .data_model_of(kd.kind)
                    .ok_or_else(|| StorageError::unknown_kind(kd.kind))?;
                let limit = self.registry.max_value_size(kd.kind).unwrap_or(usize::MAX);

                for data in &kd.values {
                    let value_model = data.value.data_model();
                    if value_model != model {
                        return Err(StorageError::model_mismatch(kd.kind, model, value_model));
                    }
                    let size = data.value.data_value().value.len();
                    if size > limit {
                        return Err(StorageError::DataTooLarge {
                            kind: kd.kind,
                            size,
                            limit,
                        });
                    }
                    if data.is_signed()
                        && !self.access.data_signature_valid(resource, kd.kind, data)
                    {
                        warn!(resource_id = %resource, kind = kd.kind, "Rejected value with invalid signature");
                        return Err(StorageError::AccessDenied {
                            kind: kd.kind,
                            reason: "signature validation failed".to_string(),
                        });
                    }
                }
                Ok(model)
            })
            .collect()
    }
}

impl StorageApi for StorageEngine {
    fn store(
        &self,
        resource: ResourceId,
        kind_data: &[StoreKindData],
    ) -> Result<Vec<StoreKindResponse>, StorageError> {
        let models = self.validate(&resource, kind_data)?;

        let mut prepared = Vec::with_capacity(kind_data.len());
        for kd in kind_data {
            let mut values = kd.values.clone();
            if self.config.sign_unsigned_values {
                for data in values.iter_mut().filter(|d| !d.is_signed()) {
                    sign_stored_data(self.signer.as_ref(), &resource, kd.kind, data)?;
                }
            }
            prepared.push(values);
        }

        let responses = self.with_resource_mut(resource, |store| {
            let mut responses = Vec::with_capacity(kind_data.len());
            for ((kd, model), values) in kind_data.iter().zip(models).zip(prepared) {
                let value_count = values.len();
                if values.is_empty() {
                    store.record_generation(kd.kind, model, kd.generation)?;
                }
                for data in values {
                    store.add_stored_data(kd.kind, model, data, kd.generation)?;
                }
                debug!(
                    resource_id = %resource,
                    kind = kd.kind,
                    generation = kd.generation,
                    values = value_count,
                    "Stored kind data"
                );
                responses.push(StoreKindResponse {
                    kind: kd.kind,
                    generation: kd.generation,
                });
            }
            Ok::<_, StorageError>(responses)
        })?;

        for (kd, resp) in kind_data.iter().zip(&responses) {
            self.events.publish(OverlayEvent::ResourceStored {
                resource_id: resource,
                kind: resp.kind,
                generation: resp.generation,
                value_count: kd.values.len(),
            });
        }
        Ok(responses)
    }

    fn fetch(
        &self,
        resource: &ResourceId,
        spec: &StoredDataSpecifier,
    ) -> Result<Option<FetchKindResponse>, StorageError> {
        let Some(entry) = self.resource(resource) else {
            debug!(resource_id = %resource, kind = spec.kind, "Fetch for unknown resource");
            return Ok(None);
        };
        let store = entry.lock();
        store.query(spec).map(Some)
    }

    fn generation(&self, resource: &ResourceId, kind: KindId) -> Result<u64, StorageError> {
        let entry = self
            .resource(resource)
            .ok_or(StorageError::ResourceNotFound(*resource))?;
        let store = entry.lock();
        store
            .generation(kind)
            .ok_or(StorageError::KindNotFound { kind })
    }

    fn remove(&self, resource: &ResourceId) -> bool {
        let removed = self.resources.write().remove(resource).is_some();
        if removed {
            debug!(resource_id = %resource, "Removed resource");
        }
        removed
    }

    fn resource_ids(&self) -> Vec<ResourceId> {
        self.resources.read().keys().copied().collect()
    }

    fn store_kind_data_for(&self, resource: &ResourceId) -> Option<Vec<StoreKindData>> {
        self.resource(resource)
            .map(|entry| entry.lock().store_kind_data())
    }

    fn sweep_expired(&self, now_ms: Timestamp) -> usize {
        let entries: Vec<(ResourceId, Arc<Mutex<ResourceStore>>)> = self
            .resources
            .read()
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();

        let mut evicted = 0;
        let mut emptied = Vec::new();
        for (id, entry) in entries {
            let mut store = entry.lock();
            evicted += store.sweep_expired(now_ms);
            if store.is_empty() {
                emptied.push(id);
            }
        }

        if !emptied.is_empty() {
            let mut table = self.resources.write();
            for id in emptied {
                // A store may have landed between the sweep and this lock.
                let still_empty = table.get(&id).is_some_and(|e| e.lock().is_empty());
                if still_empty {
                    table.remove(&id);
                }
            }
        }

        if evicted > 0 {
            info!(evicted, "Expiry sweep evicted values");
            self.events.publish(OverlayEvent::ValuesExpired { evicted });
        }
        evicted
    }
}
