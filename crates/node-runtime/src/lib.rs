//! # RELOAD Overlay Node Runtime
//!
//! Wires one overlay peer together and provides in-process stand-ins for
//! the collaborators the components only know as ports.
//!
//! ## Modular Structure
//!
//! - `config` - `PeerConfig` and the TOML config provider
//! - `adapters/` - In-memory network, static ring topology, router-backed
//!   DHT client and gateway adapters
//! - `peer` - `OverlayPeer`, the composition root
//!
//! ## Component Graph
//!
//! ```text
//!              ┌──────────────┐
//!   inbox ───→ │    Router    │ ←── GatewayPort ──┐
//!              └──────┬───────┘                   │
//!          Store/Fetch│       ↑ request     ┌─────┴────────┐
//!                     ↓       │             │ GatewayRelay │
//!              ┌──────────────┐  DhtClient  └─────┬────────┘
//!              │StorageEngine │ ←── RedirService ←┘ ServiceResolver
//!              └──────────────┘
//! ```
//!
//! A gateway is two `OverlayPeer`s in one process, one per overlay,
//! connected with [`OverlayPeer::bridge`].

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod peer;

pub use adapters::{InMemoryNetwork, RingMembership, StaticRingTopology};
pub use config::{ConfigError, PeerConfig, TomlConfigProvider};
pub use peer::OverlayPeer;
