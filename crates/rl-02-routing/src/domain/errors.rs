//! # Domain Errors
//!
//! Error types for message routing, and their mapping onto the `ErrorCode`
//! carried in an `Error` answer.

use rl_01_storage::StorageError;
use shared_types::{CodecError, Destination, ErrorCode};
use thiserror::Error;

/// Errors that can occur while routing or serving a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The next hop has no node identity.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// No answer arrived in time.
    #[error("transaction {transaction_id} timed out")]
    Timeout { transaction_id: u64 },

    /// The message code is unknown or not valid here.
    #[error("protocol violation (code {code}): {detail}")]
    ProtocolViolation { code: u16, detail: String },

    /// Access control refused the request.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The remote peer answered with an `Error` message.
    #[error("remote error {code}: {reason}")]
    Remote { code: ErrorCode, reason: String },

    /// The topology knows no next hop.
    #[error("no route to {0}")]
    NoRoute(Destination),

    /// No gateway can carry the message into its destination overlay.
    #[error("no gateway into overlay {0}")]
    NoGateway(String),

    /// The hop budget ran out.
    #[error("ttl exceeded")]
    TtlExceeded,

    /// The peer is leaving the overlay.
    #[error("peer is shutting down")]
    ShuttingDown,

    /// The answer had an unexpected body.
    #[error("unexpected answer: expected {expected}, got code {actual}")]
    UnexpectedAnswer { expected: &'static str, actual: u16 },

    /// Local storage rejected the operation.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Encoding for signing failed.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

impl RoutingError {
    /// The wire error code reported to a remote requester.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::AccessDenied(_) => ErrorCode::Forbidden,
            Self::Timeout { .. } => ErrorCode::RequestTimeout,
            Self::TtlExceeded => ErrorCode::TtlExceeded,
            Self::NoRoute(_) => ErrorCode::NotFound,
            Self::NoGateway(_) => ErrorCode::UnsupportedForwardingOption,
            Self::Remote { code, .. } => *code,
            Self::Storage(err) => match err {
                StorageError::ResourceNotFound(_) | StorageError::KindNotFound { .. } => {
                    ErrorCode::NotFound
                }
                StorageError::UnsupportedDataModel { .. } => ErrorCode::UnknownKind,
                StorageError::AccessDenied { .. } => ErrorCode::Forbidden,
                StorageError::DataTooLarge { .. } => ErrorCode::DataTooLarge,
                StorageError::Signing(_) => ErrorCode::InvalidMessage,
            },
            Self::InvalidTarget(_)
            | Self::ProtocolViolation { .. }
            | Self::ShuttingDown
            | Self::UnexpectedAnswer { .. }
            | Self::Codec(_) => ErrorCode::InvalidMessage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_wire_codes() {
        let too_large = RoutingError::from(StorageError::DataTooLarge {
            kind: 1,
            size: 10,
            limit: 5,
        });
        assert_eq!(too_large.error_code(), ErrorCode::DataTooLarge);

        let unknown = RoutingError::from(StorageError::UnsupportedDataModel {
            kind: 7,
            detail: "unknown kind".into(),
        });
        assert_eq!(unknown.error_code(), ErrorCode::UnknownKind);
    }

    #[test]
    fn test_remote_code_passes_through() {
        let err = RoutingError::Remote {
            code: ErrorCode::Other(99),
            reason: "x".into(),
        };
        assert_eq!(err.error_code(), ErrorCode::Other(99));
        assert_eq!(
            RoutingError::AccessDenied("no".into()).error_code(),
            ErrorCode::Forbidden
        );
    }
}
