//! # Message Router (rl-02)
//!
//! Moves overlay messages hop by hop and serves the requests that terminate
//! at this peer.
//!
//! ## Responsibilities
//!
//! - Forwarding header processing: destination list consumption, via list
//!   recording, TTL, loop detection
//! - Cross-overlay classification (inject, hand to gateway, relay)
//! - Transaction correlation with a timeout on every awaited answer
//! - Request handlers: Ping, Store, Fetch, Attach, AppAttach, Join, Leave,
//!   Update
//!
//! ## Domain Invariants
//!
//! | # | Invariant | Description |
//! |---|-----------|-------------|
//! | 1 | Fresh Transactions | Transaction ids strictly increase per peer |
//! | 2 | Bounded Waits | Every awaited answer has a timeout |
//! | 3 | Total Decision Table | Each cross-overlay message matches exactly one rule |
//! | 4 | Quiet Exit | Nothing is sent once the peer is exiting |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Forwarding rules, transaction table, lifecycle, errors
//! - `ports/` - `RoutingApi` (inbound); `Topology`, `Transport`, `GatewayPort` (outbound)
//! - `service/` - `Router` and its request handlers

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    classify, OverlayDecision, PeerState, RoutingConfig, RoutingError, TransactionTable,
};
pub use ports::{GatewayPort, PeerContact, RoutingApi, Topology, Transport, TransportError};
pub use service::{Router, RouterDependencies};
