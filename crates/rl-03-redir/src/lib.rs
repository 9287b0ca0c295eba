//! # ReDiR: Recursive Distributed Rendezvous (rl-03)
//!
//! A service directory built only from DHT Store and Fetch. Level `l`
//! partitions the ring into `2^l` buckets; a provider records itself in the
//! buckets it falls into, from a coarse level down to the level where it is
//! alone. A lookup walks the same buckets to find the provider whose id is
//! the closest successor of its key.
//!
//! ## Domain Invariants
//!
//! | # | Invariant | Description |
//! |---|-----------|-------------|
//! | 1 | Deterministic Buckets | `partition_index` is identical on every peer |
//! | 2 | Complete Start Level | Every provider is recorded at `L_start` |
//! | 3 | Termination | A lookup never fetches the same level twice |
//! | 4 | Empty Is Absent | A fetch with no values means no registrants |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Partitioning, records, registration and lookup state machines
//! - `ports/` - `RedirApi` (inbound), `DhtClient` (outbound)
//! - `service/` - `RedirService`, the async driver
//!
//! ## Usage
//!
//! ```ignore
//! let redir = RedirService::new(node_id, RedirConfig::default(), dht, events)?;
//! redir.register("blue").await?;
//! let gateway = redir.lookup("blue").await?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    bucket_name, bucket_resource, partition_index, LookupOperation, RedirConfig, RedirError,
    RedirStatus, RegisterOperation,
};
pub use ports::{DhtClient, RedirApi, Registration};
pub use service::RedirService;
