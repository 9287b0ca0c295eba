//! Storage engine configuration.

use std::time::Duration;

/// Configuration for the storage engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// How often the runtime runs the expiry sweep.
    pub sweep_interval: Duration,
    /// Sign values that arrive without a signature before storing them.
    pub sign_unsigned_values: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            sign_unsigned_values: true,
        }
    }
}

impl StorageConfig {
    /// Set the sweep interval.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Store unsigned values as they arrive.
    #[must_use]
    pub fn without_signing(mut self) -> Self {
        self.sign_unsigned_values = false;
        self
    }
}
