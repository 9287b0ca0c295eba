//! # Shared Bus - Overlay Event Bus
//!
//! Components announce state changes (values stored, ReDiR lookups resolved,
//! gateway requests dropped) on a broadcast bus; observers subscribe with a
//! topic filter.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐   recv()   ┌──────────┐
//! │ StorageEngine│ ────────────▶ │  Event Bus   │ ─────────▶ │ Observer │
//! │ RedirService │               │              │            │          │
//! └──────────────┘               └──────────────┘            └──────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, OverlayEvent};
pub use publisher::{EventPublisher, InMemoryEventBus, NoopPublisher};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
