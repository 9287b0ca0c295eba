//! # RELOAD Overlay Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (codec, storage engine)
//! └── src/integration/  # Several peers over the in-memory network
//!     ├── support.rs        # Peer fixtures
//!     ├── storage_flows.rs  # Store/Fetch across peers
//!     ├── redir_flows.rs    # ReDiR registration and lookup
//!     └── gateway_flows.rs  # Two overlays joined by a gateway
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rl-tests
//!
//! # By flow
//! cargo test -p rl-tests integration::gateway_flows::
//!
//! # Benchmarks
//! cargo bench -p rl-tests
//! ```

#![allow(dead_code)]

pub mod integration;
