//! # Inbound Ports (Driving Side)
//!
//! The API the router's Store and Fetch handlers and the runtime's sweep
//! timer call.

use crate::domain::errors::StorageError;
use shared_types::{
    FetchKindResponse, KindId, ResourceId, StoreKindData, StoreKindResponse, StoredDataSpecifier,
    Timestamp,
};

/// Storage engine API.
pub trait StorageApi: Send + Sync {
    /// Write every value of every kind under `resource`.
    ///
    /// The batch is validated as a whole before anything is written.
    ///
    /// # Errors
    ///
    /// - `UnsupportedDataModel`: unknown kind, or a value using another model
    /// - `DataTooLarge`: a payload exceeds the kind's limit
    /// - `AccessDenied`: a signed value failed signature validation
    fn store(
        &self,
        resource: ResourceId,
        kind_data: &[StoreKindData],
    ) -> Result<Vec<StoreKindResponse>, StorageError>;

    /// Answer one specifier.
    ///
    /// `Ok(None)` if the resource is unknown; a known resource always answers,
    /// possibly with no values.
    fn fetch(
        &self,
        resource: &ResourceId,
        spec: &StoredDataSpecifier,
    ) -> Result<Option<FetchKindResponse>, StorageError>;

    /// Generation of `kind` under `resource`.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` or `KindNotFound`.
    fn generation(&self, resource: &ResourceId, kind: KindId) -> Result<u64, StorageError>;

    /// Drop a resource entirely. Returns whether it existed.
    fn remove(&self, resource: &ResourceId) -> bool;

    /// Ids of every resource held.
    fn resource_ids(&self) -> Vec<ResourceId>;

    /// Everything held under `resource`, for replication.
    fn store_kind_data_for(&self, resource: &ResourceId) -> Option<Vec<StoreKindData>>;

    /// Evict expired values. Returns how many were evicted.
    fn sweep_expired(&self, now_ms: Timestamp) -> usize;
}
