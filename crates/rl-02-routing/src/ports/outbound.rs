//! # Driven Ports (Outbound SPI)
//!
//! What the router requires from its host: a ring topology that picks next
//! hops, a transport that moves messages, and optionally a gateway that
//! carries messages between overlays.

use async_trait::async_trait;
use shared_types::{CodecError, Destination, Message, NodeId, ResourceId};
use std::fmt;
use thiserror::Error;

/// Where to send a message next.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerContact {
    /// Identity of the peer, if known.
    pub node_id: Option<NodeId>,
    /// Transport address.
    pub address: String,
}

impl PeerContact {
    /// Contact for a known peer.
    #[must_use]
    pub fn new(node_id: NodeId, address: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id),
            address: address.into(),
        }
    }

    /// Contact whose identity is not yet known (e.g. a bootstrap address).
    #[must_use]
    pub fn anonymous(address: impl Into<String>) -> Self {
        Self {
            node_id: None,
            address: address.into(),
        }
    }
}

impl fmt::Display for PeerContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "{id}@{}", self.address),
            None => write!(f, "?@{}", self.address),
        }
    }
}

/// Ring topology: next-hop selection and membership events.
///
/// Ring maintenance itself happens behind this trait.
pub trait Topology: Send + Sync {
    /// Next hop toward `destination`, if any.
    fn next_hop(&self, destination: &Destination) -> Option<PeerContact>;

    /// Whether this peer stores `resource`.
    fn is_responsible(&self, resource: &ResourceId) -> bool;

    /// A peer asked to join; returns the topology-specific answer payload.
    fn on_join(&self, peer: NodeId, overlay_data: &[u8]) -> Vec<u8>;

    /// A peer announced that it leaves.
    fn on_leave(&self, peer: NodeId);

    /// A neighbour sent a topology update.
    fn on_update(&self, from: NodeId, payload: &[u8]);
}

/// Errors from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Nobody listens at the address.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The message could not be framed.
    #[error("framing failed: {0}")]
    Codec(#[from] CodecError),
}

/// Moves messages between peers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `message` to `next_hop`.
    async fn send(&self, message: Message, next_hop: PeerContact) -> Result<(), TransportError>;
}

/// Carries messages into another overlay.
pub trait GatewayPort: Send + Sync {
    /// Whether this peer is itself a gateway into `overlay`.
    fn bridges(&self, overlay: &str) -> bool;

    /// Take over a message bound for `destination_overlay`.
    fn receive(&self, destination_overlay: &str, message: Message);
}
