//! # Driven Ports (Outbound SPI)

use crate::domain::errors::RedirError;
use async_trait::async_trait;
use shared_types::{ResourceId, StoreKindData, StoredData, StoredDataSpecifier};

/// Store and Fetch against the overlay's DHT.
///
/// ReDiR never touches storage directly; every record goes through the peer
/// responsible for its bucket.
#[async_trait]
pub trait DhtClient: Send + Sync {
    /// Store `kind_data` under `resource`.
    async fn store(&self, resource: ResourceId, kind_data: StoreKindData) -> Result<(), RedirError>;

    /// Values matching `spec` under `resource`.
    ///
    /// An unknown resource yields an empty list, not an error.
    async fn fetch(
        &self,
        resource: ResourceId,
        spec: StoredDataSpecifier,
    ) -> Result<Vec<StoredData>, RedirError>;
}
