//! # Driving Ports (Inbound API)

use crate::domain::errors::RedirError;
use async_trait::async_trait;
use shared_types::NodeId;

/// Outcome of a completed registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub namespace: String,
    pub node_id: NodeId,
    /// Levels a record was stored at, in order.
    pub levels: Vec<u32>,
}

/// ReDiR API.
#[async_trait]
pub trait RedirApi: Send + Sync {
    /// Register this peer as a provider for `namespace`.
    async fn register(&self, namespace: &str) -> Result<Registration, RedirError>;

    /// Provider for `namespace` closest to this peer's id.
    async fn lookup(&self, namespace: &str) -> Result<NodeId, RedirError>;

    /// Provider for `namespace` closest to `key`: the smallest registrant
    /// `>= key`, or the smallest overall.
    async fn lookup_key(&self, namespace: &str, key: NodeId) -> Result<NodeId, RedirError>;
}
