//! # Gateway Configuration

/// Gateway relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Overlay this relay belongs to.
    pub overlay_name: String,
    /// Requests allowed to wait for one namespace's lookup.
    pub max_queued_per_namespace: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            overlay_name: "reload".to_string(),
            max_queued_per_namespace: 256,
        }
    }
}

impl GatewayConfig {
    /// Config for the named overlay.
    #[must_use]
    pub fn for_overlay(overlay_name: impl Into<String>) -> Self {
        Self {
            overlay_name: overlay_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_queued_per_namespace(mut self, limit: usize) -> Self {
        self.max_queued_per_namespace = limit;
        self
    }
}
