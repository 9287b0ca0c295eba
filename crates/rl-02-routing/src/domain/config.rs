//! # Routing Configuration

use shared_types::DEFAULT_TTL;
use std::time::Duration;

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Name of the overlay this peer belongs to.
    pub overlay_name: String,
    /// How long a request waits for its answer.
    pub request_timeout: Duration,
    /// Hop budget of messages this peer creates.
    pub initial_ttl: u8,
    /// Candidate address advertised in Attach answers.
    pub local_address: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            overlay_name: "reload".to_string(),
            request_timeout: Duration::from_secs(3),
            initial_ttl: DEFAULT_TTL,
            local_address: "127.0.0.1:6084".to_string(),
        }
    }
}

impl RoutingConfig {
    /// Config for the named overlay, other fields defaulted.
    #[must_use]
    pub fn for_overlay(overlay_name: impl Into<String>) -> Self {
        Self {
            overlay_name: overlay_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_initial_ttl(mut self, ttl: u8) -> Self {
        self.initial_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_local_address(mut self, address: impl Into<String>) -> Self {
        self.local_address = address.into();
        self
    }
}
