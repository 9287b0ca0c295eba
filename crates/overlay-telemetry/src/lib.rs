//! # Overlay Telemetry
//!
//! Structured logging for overlay peers, built on `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use overlay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::for_peer("gateway"))?;
//!     // Every tracing macro now reaches the configured output.
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELOAD_LOG_LEVEL` | `RUST_LOG`, then `info` | Filter directive |
//! | `RELOAD_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `RELOAD_SERVICE_NAME` | `reload-peer` | Service name |
//! | `RELOAD_LOG_SOURCE` | `false` | File and line in records |

mod config;
mod logging;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialisation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("a global subscriber is already installed")]
    AlreadyInitialised,

    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// `AlreadyInitialised` on a second call in the same process, and
/// `InvalidFilter` when the level directive does not parse.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    logging::init_logging(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let config = TelemetryConfig::default().with_log_level("warn");
        // The first call may race other tests in this binary; only the
        // second one is asserted.
        let _ = init_telemetry(&config);
        assert_eq!(
            init_telemetry(&config),
            Err(TelemetryError::AlreadyInitialised)
        );
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        let config = TelemetryConfig::default().with_log_level("rl_02_routing=loud");
        assert!(matches!(
            init_telemetry(&config),
            Err(TelemetryError::InvalidFilter(_))
        ));
    }
}
