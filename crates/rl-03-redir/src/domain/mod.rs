//! # Domain Layer
//!
//! Ring partitioning, provider records and the registration and lookup
//! state machines. No I/O.

pub mod config;
pub mod errors;
pub mod operation;
pub mod partition;
pub mod record;

pub use config::{RedirConfig, MAX_SUPPORTED_LEVEL};
pub use errors::RedirError;
pub use operation::{
    is_sandwiched, BucketRef, LookupOperation, LookupStep, RedirStatus, RegisterOperation,
    RegisterStep,
};
pub use partition::partition_index;
pub use record::{all_registrants, bucket_name, bucket_resource, parse_registrants, provider_record};
