//! # Shared Types
//!
//! Types shared by every component of the overlay peer.
//!
//! ## Modules
//!
//! - `identifiers`: fixed-width big-endian ids, `NodeId` and `ResourceId`
//! - `data_model`: stored values, specifiers and fetch results
//! - `kinds`: kind id to data model registry
//! - `message`: forwarding header, message codes and bodies
//! - `codec`: big-endian length-prefixed wire framing
//! - `security`: signing and access-control capabilities

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod data_model;
pub mod errors;
pub mod identifiers;
pub mod kinds;
pub mod message;
pub mod security;

pub use data_model::{
    ArrayRange, DataModel, DataSelector, DataValue, FetchKindResponse, KindId, StoreKindData,
    StoredData, StoredDataSpecifier, StoredValue, APPEND_INDEX,
};
pub use errors::{CodecError, DataModelError, IdentifierError};
pub use identifiers::{Identifier, NodeId, OverlayIdentifier, ResourceId, ID_LEN};
pub use kinds::{well_known, KindDefinition, KindRegistry, StaticKindRegistry};
pub use message::{
    AppAttachRequest, AttachRequest, Destination, ErrorAnswer, ErrorCode, FetchAnswer,
    FetchRequest, ForwardingHeader, JoinRequest, LeaveRequest, Message, MessageBody, MessageCode,
    OverlayForwardingOptions, PingAnswer, StoreAnswer, StoreKindResponse, StoreRequest,
    DEFAULT_TTL,
};
pub use security::{
    AccessController, HmacAccessController, HmacSecurityBlock, PermissiveAccessController,
    SecurityBlock,
};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
