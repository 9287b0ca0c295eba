//! # Ports Layer
//!
//! - `inbound`: `RoutingApi`, driven by the transport and local services
//! - `outbound`: `Topology`, `Transport` and `GatewayPort`

pub mod inbound;
pub mod outbound;

pub use inbound::RoutingApi;
pub use outbound::{GatewayPort, PeerContact, Topology, Transport, TransportError};
