//! # Static Ring Topology
//!
//! Successor-based responsibility over a membership list shared by all
//! peers of one overlay. Every member knows every other member, so a next
//! hop is always the final destination.

use parking_lot::RwLock;
use rl_02_routing::{PeerContact, Topology};
use shared_types::{Destination, NodeId, OverlayIdentifier, ResourceId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Members of one overlay, ordered by id.
#[derive(Debug, Default)]
pub struct RingMembership {
    members: RwLock<BTreeMap<NodeId, PeerContact>>,
}

impl RingMembership {
    pub fn insert(&self, node_id: NodeId, address: impl Into<String>) {
        self.members
            .write()
            .insert(node_id, PeerContact::new(node_id, address));
    }

    pub fn remove(&self, node_id: &NodeId) -> bool {
        self.members.write().remove(node_id).is_some()
    }

    #[must_use]
    pub fn contact(&self, node_id: &NodeId) -> Option<PeerContact> {
        self.members.read().get(node_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The member responsible for `id`: the first member at or after it,
    /// wrapping to the lowest.
    #[must_use]
    pub fn successor(&self, id: &OverlayIdentifier) -> Option<PeerContact> {
        let members = self.members.read();
        members
            .range(NodeId(*id)..)
            .next()
            .or_else(|| members.iter().next())
            .map(|(_, contact)| contact.clone())
    }
}

/// Topology of one peer over a shared membership.
pub struct StaticRingTopology {
    own: NodeId,
    ring: Arc<RingMembership>,
}

impl StaticRingTopology {
    #[must_use]
    pub fn new(own: NodeId, ring: Arc<RingMembership>) -> Self {
        Self { own, ring }
    }

    #[must_use]
    pub fn ring(&self) -> &Arc<RingMembership> {
        &self.ring
    }
}

impl Topology for StaticRingTopology {
    fn next_hop(&self, destination: &Destination) -> Option<PeerContact> {
        match destination {
            Destination::Node(id) => self.ring.contact(id),
            Destination::Resource(id) => self.ring.successor(id.as_identifier()),
        }
    }

    fn is_responsible(&self, resource: &ResourceId) -> bool {
        self.ring
            .successor(resource.as_identifier())
            .and_then(|contact| contact.node_id)
            == Some(self.own)
    }

    fn on_join(&self, peer: NodeId, overlay_data: &[u8]) -> Vec<u8> {
        info!(node_id = %self.own, joining = %peer, "Peer joining");
        // The joining peer echoes its address as overlay data.
        if let Ok(address) = std::str::from_utf8(overlay_data) {
            if !address.is_empty() {
                self.ring.insert(peer, address);
            }
        }
        Vec::new()
    }

    fn on_leave(&self, peer: NodeId) {
        if self.ring.remove(&peer) {
            info!(node_id = %self.own, leaving = %peer, "Peer left ring");
        }
    }

    fn on_update(&self, from: NodeId, payload: &[u8]) {
        debug!(node_id = %self.own, from = %from, bytes = payload.len(), "Topology update ignored");
    }
}
