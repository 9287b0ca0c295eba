//! # Overlay Events
//!
//! Notifications published by the storage engine, the ReDiR service and the
//! gateway relay.

use shared_types::{KindId, NodeId, ResourceId};

/// Topic an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    /// Storage engine events.
    Storage,
    /// ReDiR registrations and lookups.
    Redir,
    /// Gateway relay events.
    Gateway,
    /// All events (no filtering).
    All,
}

/// An event on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    /// Values of one kind were written under a resource.
    ResourceStored {
        resource_id: ResourceId,
        kind: KindId,
        generation: u64,
        value_count: usize,
    },

    /// The expiry sweep evicted stored values.
    ValuesExpired { evicted: usize },

    /// A ReDiR registration finished.
    RegistrationCompleted {
        namespace: String,
        node_id: NodeId,
        /// Levels a record was stored at.
        levels: Vec<u32>,
    },

    /// A ReDiR lookup resolved.
    LookupCompleted {
        namespace: String,
        key: NodeId,
        node_id: NodeId,
    },

    /// A ReDiR lookup found no registrant or failed.
    LookupFailed {
        namespace: String,
        key: NodeId,
        reason: String,
    },

    /// A queued gateway request could not be delivered.
    GatewayRequestFailed {
        namespace: String,
        request: &'static str,
        reason: String,
    },
}

impl OverlayEvent {
    /// Topic of this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ResourceStored { .. } | Self::ValuesExpired { .. } => EventTopic::Storage,
            Self::RegistrationCompleted { .. }
            | Self::LookupCompleted { .. }
            | Self::LookupFailed { .. } => EventTopic::Redir,
            Self::GatewayRequestFailed { .. } => EventTopic::Gateway,
        }
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Accept all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept only the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &OverlayEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
