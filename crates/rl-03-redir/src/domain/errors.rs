//! # Domain Errors

use shared_types::NodeId;
use thiserror::Error;

/// Errors that can occur during ReDiR registration or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirError {
    /// No registrant was found for the namespace.
    #[error("lookup in namespace {namespace} for {key} found no registrant")]
    LookupFailed { namespace: String, key: NodeId },

    /// A fetched record contradicts the bucket it was found in.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A DHT store or fetch failed.
    #[error("dht operation failed: {0}")]
    Dht(String),

    /// A DHT store or fetch got no answer in time.
    #[error("dht operation timed out")]
    Timeout,

    /// Levels are out of range.
    #[error("invalid level configuration: {0}")]
    InvalidConfig(String),
}
