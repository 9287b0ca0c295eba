//! # Outbound Ports (Driven Side)

use shared_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// Abstract interface for time.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> Timestamp {
        shared_types::now_millis()
    }
}

/// Time source advanced by hand, for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicU64,
}

impl ManualTimeSource {
    /// Start at `now_ms`.
    #[must_use]
    pub fn new(now_ms: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now_ms),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by_ms: u64) {
        self.now.fetch_add(by_ms, Ordering::SeqCst);
    }

    /// Set the clock.
    pub fn set(&self, now_ms: Timestamp) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
