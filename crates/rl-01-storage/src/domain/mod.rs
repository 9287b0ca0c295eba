//! # Domain Layer
//!
//! Storage model and errors, free of I/O and locking.

pub mod config;
pub mod errors;
pub mod resource;

pub use config::StorageConfig;
pub use errors::StorageError;
pub use resource::{KindStore, KindValues, ResourceStore};
