//! # Forwarding Decisions
//!
//! Pure functions over the forwarding header.
//!
//! ## Cross-Overlay Decision Table
//!
//! Evaluated on the overlay options before anything else, first match wins:
//!
//! | # | Condition | Decision |
//! |---|-----------|----------|
//! | 1 | `destination_overlay == own` | `InjectLocally` |
//! | 2 | `source_overlay == own` | `ForwardToGateway` |
//! | 3 | otherwise | `Relay` |

use shared_types::{Destination, NodeId, OverlayForwardingOptions};

/// What to do with a message carrying overlay options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayDecision {
    /// Process as a same-overlay message.
    InjectLocally,
    /// Carry the message to a gateway into the destination overlay.
    ForwardToGateway,
    /// Neither end is this overlay; pass it along.
    Relay,
}

/// Classify cross-overlay traffic for a peer in `own_overlay`.
#[must_use]
pub fn classify(own_overlay: &str, options: &OverlayForwardingOptions) -> OverlayDecision {
    if options.destination_overlay == own_overlay {
        OverlayDecision::InjectLocally
    } else if options.source_overlay == own_overlay {
        OverlayDecision::ForwardToGateway
    } else {
        OverlayDecision::Relay
    }
}

/// Remove every leading entry naming `own`. Returns how many were removed.
pub fn pop_own_heads(destination_list: &mut Vec<Destination>, own: NodeId) -> usize {
    let count = destination_list
        .iter()
        .take_while(|d| **d == Destination::Node(own))
        .count();
    destination_list.drain(..count);
    count
}

/// Record `own` as the latest relay, unless it already is.
pub fn record_via(via_list: &mut Vec<Destination>, own: NodeId) {
    let me = Destination::Node(own);
    if via_list.last() != Some(&me) {
        via_list.push(me);
    }
}
