//! # Adapters
//!
//! Implementations of the component ports for an in-process peer.

pub mod dht;
pub mod gateway;
pub mod network;
pub mod topology;

pub use dht::RouterDhtClient;
pub use gateway::{RedirResolver, RelayGatewayPort, RouterMessenger};
pub use network::{InMemoryNetwork, Inbox};
pub use topology::{RingMembership, StaticRingTopology};
