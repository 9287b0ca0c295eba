//! # Domain Layer
//!
//! Forwarding rules, transaction correlation, peer lifecycle and errors.

pub mod config;
pub mod errors;
pub mod forwarding;
pub mod state;
pub mod transactions;

pub use config::RoutingConfig;
pub use errors::RoutingError;
pub use forwarding::{classify, pop_own_heads, record_via, OverlayDecision};
pub use state::PeerState;
pub use transactions::{TransactionStats, TransactionTable};
