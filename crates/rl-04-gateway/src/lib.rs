//! # Gateway Relay (rl-04)
//!
//! Joins overlays. Gateways register the namespaces they serve through
//! ReDiR; a peer that wants to reach another overlay resolves the namespace
//! once, caches the gateway's node id and routes through it.
//!
//! ## Domain Invariants
//!
//! | # | Invariant | Description |
//! |---|-----------|-------------|
//! | 1 | Single Lookup | At most one lookup per namespace is in flight |
//! | 2 | Cache First | A cached namespace never triggers a lookup |
//! | 3 | No Silent Loss | A failed lookup fails every request queued behind it; relayed requests get an `Error` answer |
//! | 4 | Re-signed | A message crossing the relay carries this peer's signature |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Config, errors, queued requests
//! - `ports/` - `OverlayMessenger` and `ServiceResolver` (outbound)
//! - `service/` - `GatewayRelay`

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{GatewayConfig, GatewayError, GatewayOutcome, GatewayRequest};
pub use ports::{OverlayMessenger, ServiceResolver};
pub use service::GatewayRelay;
