//! # Integration Flows
//!
//! Whole peers, wired by `node-runtime`, talking through the in-memory
//! network. Every hop runs the wire codec and the overlay-key signatures.

pub mod support;

mod gateway_flows;
mod redir_flows;
mod storage_flows;
