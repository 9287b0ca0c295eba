//! # Ports Layer
//!
//! - `inbound`: `RedirApi`, used by the gateway relay and the peer runtime
//! - `outbound`: `DhtClient`, Store/Fetch over the overlay

pub mod inbound;
pub mod outbound;

pub use inbound::{RedirApi, Registration};
pub use outbound::DhtClient;
