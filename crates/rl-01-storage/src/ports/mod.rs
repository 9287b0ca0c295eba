//! # Ports Layer
//!
//! - `inbound`: the API the router drives
//! - `outbound`: what the engine needs from its host

pub mod inbound;
pub mod outbound;

pub use inbound::StorageApi;
pub use outbound::{ManualTimeSource, SystemTimeSource, TimeSource};
