//! # Domain Errors

use shared_types::ErrorCode;
use thiserror::Error;

/// Errors that can occur while relaying through a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The namespace could not be resolved to a gateway.
    #[error("no gateway for namespace {namespace}: {reason}")]
    LookupFailed { namespace: String, reason: String },

    /// Too many requests already wait for this namespace.
    #[error("{limit} requests already queued for namespace {namespace}")]
    QueueFull { namespace: String, limit: usize },

    /// The request was dropped before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// The router could not send or got no answer.
    #[error("routing failed: {0}")]
    Routing(String),

    /// The remote side answered with an `Error` message.
    #[error("remote error {code}: {reason}")]
    Remote { code: ErrorCode, reason: String },

    /// The answer had an unexpected body.
    #[error("unexpected answer code {0}")]
    UnexpectedAnswer(u16),
}

impl GatewayError {
    /// The wire error code reported when a relayed request fails here.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::LookupFailed { .. } | Self::Routing(_) => ErrorCode::NotFound,
            Self::QueueFull { .. } => ErrorCode::InProgress,
            Self::Cancelled => ErrorCode::RequestTimeout,
            Self::Remote { code, .. } => *code,
            Self::UnexpectedAnswer(_) => ErrorCode::InvalidMessage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_for_relayed_requests() {
        let lookup = GatewayError::LookupFailed {
            namespace: "green".into(),
            reason: "no registrants".into(),
        };
        assert_eq!(lookup.error_code(), ErrorCode::NotFound);
        assert_eq!(
            GatewayError::Remote {
                code: ErrorCode::DataTooLarge,
                reason: String::new()
            }
            .error_code(),
            ErrorCode::DataTooLarge
        );
    }
}
