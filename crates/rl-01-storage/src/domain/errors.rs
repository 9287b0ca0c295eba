//! # Domain Errors
//!
//! Error types for the storage engine.

use shared_types::{CodecError, DataModel, KindId, ResourceId};
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No resource with this id is held locally.
    #[error("resource {0} not found")]
    ResourceNotFound(ResourceId),

    /// The resource holds nothing of this kind.
    #[error("kind {kind} not stored under resource")]
    KindNotFound { kind: KindId },

    /// The kind is unregistered, or a value or specifier uses a model other
    /// than the kind's.
    #[error("unsupported data model for kind {kind}: {detail}")]
    UnsupportedDataModel { kind: KindId, detail: String },

    /// The value's signature was rejected by access control.
    #[error("access denied for kind {kind}: {reason}")]
    AccessDenied { kind: KindId, reason: String },

    /// A payload exceeds the kind's size limit.
    #[error("value of {size} bytes exceeds limit of {limit} for kind {kind}")]
    DataTooLarge { kind: KindId, size: usize, limit: usize },

    /// Signing an unsigned value failed.
    #[error("failed to sign value: {0}")]
    Signing(#[from] CodecError),
}

impl StorageError {
    pub(crate) fn model_mismatch(kind: KindId, expected: DataModel, actual: DataModel) -> Self {
        Self::UnsupportedDataModel {
            kind,
            detail: format!("kind uses {expected:?}, got {actual:?}"),
        }
    }

    pub(crate) fn unknown_kind(kind: KindId) -> Self {
        Self::UnsupportedDataModel {
            kind,
            detail: "kind is not registered".to_string(),
        }
    }
}
