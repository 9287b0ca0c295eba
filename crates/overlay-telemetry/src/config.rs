//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration for one peer process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Name attached to every log line.
    pub service_name: String,

    /// `EnvFilter` directive (trace, debug, info, warn, error or per-target)
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,

    /// Include file and line in each record
    pub with_source_location: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "reload-peer".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            with_source_location: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RELOAD_SERVICE_NAME`: Service name (default: reload-peer)
    /// - `RELOAD_LOG_LEVEL` or `RUST_LOG`: Filter directive (default: info)
    /// - `RELOAD_JSON_LOGS`: JSON output (default: false, true in containers)
    /// - `RELOAD_LOG_SOURCE`: Include file and line (default: false)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any variable lookup.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            var("KUBERNETES_SERVICE_HOST").is_some() || var("DOCKER_CONTAINER").is_some();
        let defaults = Self::default();

        Self {
            service_name: var("RELOAD_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: var("RELOAD_LOG_LEVEL")
                .or_else(|| var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: var("RELOAD_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(is_container),

            with_source_location: var("RELOAD_LOG_SOURCE")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        }
    }

    /// Configuration for a named peer.
    #[must_use]
    pub fn for_peer(peer_name: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("reload-{peer_name}");
        config
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
