//! # ReDiR Configuration

use crate::domain::errors::RedirError;
use std::time::Duration;

/// Deepest level whose bucket index fits a `u64`.
pub const MAX_SUPPORTED_LEVEL: u32 = 63;

/// ReDiR configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirConfig {
    /// Level where registrations and lookups start (`L_start`).
    pub starting_level: u32,
    /// Deepest level ever visited.
    pub max_level: u32,
    /// Lifetime of a provider record.
    pub record_lifetime: Duration,
    /// How often a serving peer re-registers, keeping its records alive.
    pub refresh_interval: Duration,
}

impl Default for RedirConfig {
    fn default() -> Self {
        Self {
            starting_level: 2,
            max_level: 16,
            record_lifetime: Duration::from_secs(3600),
            refresh_interval: Duration::from_secs(1800),
        }
    }
}

impl RedirConfig {
    #[must_use]
    pub fn with_starting_level(mut self, level: u32) -> Self {
        self.starting_level = level;
        self
    }

    #[must_use]
    pub fn with_max_level(mut self, level: u32) -> Self {
        self.max_level = level;
        self
    }

    /// Set the record lifetime; the refresh interval becomes half of it.
    #[must_use]
    pub fn with_record_lifetime(mut self, lifetime: Duration) -> Self {
        self.record_lifetime = lifetime;
        self.refresh_interval = lifetime / 2;
        self
    }

    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Check level bounds.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `max_level` exceeds 63, `starting_level` exceeds
    /// `max_level`, or the refresh interval is zero or not shorter than the
    /// record lifetime.
    pub fn validate(&self) -> Result<(), RedirError> {
        if self.max_level > MAX_SUPPORTED_LEVEL {
            return Err(RedirError::InvalidConfig(format!(
                "max_level {} exceeds {MAX_SUPPORTED_LEVEL}",
                self.max_level
            )));
        }
        if self.starting_level > self.max_level {
            return Err(RedirError::InvalidConfig(format!(
                "starting_level {} exceeds max_level {}",
                self.starting_level, self.max_level
            )));
        }
        if self.refresh_interval.is_zero() || self.refresh_interval >= self.record_lifetime {
            return Err(RedirError::InvalidConfig(format!(
                "refresh_interval {:?} must be non-zero and shorter than record_lifetime {:?}",
                self.refresh_interval, self.record_lifetime
            )));
        }
        Ok(())
    }

    /// Record lifetime in whole seconds, as carried by `StoredData`.
    #[must_use]
    pub fn record_lifetime_secs(&self) -> u32 {
        u32::try_from(self.record_lifetime.as_secs()).unwrap_or(u32::MAX)
    }
}
