//! # Storage Engine (rl-01)
//!
//! Holds the data this peer is responsible for, keyed by resource id and
//! kind. Every kind uses one of three data models:
//!
//! - **SingleValue**: one value per kind
//! - **Array**: values at sparse `u32` indices, with append
//! - **Dictionary**: values under string keys
//!
//! ## Domain Invariants
//!
//! | # | Invariant | Description |
//! |---|-----------|-------------|
//! | 1 | Model Consistency | A kind's values all use the kind's registered model |
//! | 2 | Batch Validation | A store validates every value before writing any |
//! | 3 | Tombstones Persist | A deleted value stays until it expires |
//! | 4 | Expiry | `storage_time + lifetime` is the eviction deadline, replicas included |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Resource model, config and errors
//! - `ports/` - `StorageApi` (inbound) and `TimeSource` (outbound)
//! - `service/` - `StorageEngine`, the concurrent implementation
//!
//! ## Usage
//!
//! ```ignore
//! use rl_01_storage::{StorageApi, StorageConfig, StorageDependencies, StorageEngine};
//!
//! let engine = StorageEngine::new(deps, StorageConfig::default());
//! engine.store(resource, &[kind_data])?;
//! let found = engine.fetch(&resource, &spec)?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{KindStore, KindValues, ResourceStore, StorageConfig, StorageError};
pub use ports::inbound::StorageApi;
pub use ports::outbound::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use service::{StorageDependencies, StorageEngine};
