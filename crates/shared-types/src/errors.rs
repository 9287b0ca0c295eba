//! Error types shared across overlay components.

use crate::data_model::KindId;
use thiserror::Error;

/// Identifier parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Byte length does not match the identifier width.
    #[error("invalid identifier length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Not a hexadecimal string.
    #[error("invalid identifier hex: {0}")]
    InvalidHex(String),
}

/// Failures constructing data model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataModelError {
    /// Two array index ranges in one specifier overlap.
    #[error("array ranges overlap: [{first_a}, {last_a}] and [{first_b}, {last_b}]")]
    Overlap {
        first_a: u32,
        last_a: u32,
        first_b: u32,
        last_b: u32,
    },

    /// A range whose first index is above its last.
    #[error("invalid array range: first {first} > last {last}")]
    InvalidRange { first: u32, last: u32 },
}

/// Wire decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before a field was complete.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A field held a value outside its domain.
    #[error("invalid {field}: {detail}")]
    InvalidValue { field: &'static str, detail: String },

    /// Value framing depends on the kind's data model and the kind is unknown.
    #[error("unknown kind {0}")]
    UnknownKind(KindId),

    /// A length did not fit its prefix.
    #[error("{field} too long for its length prefix ({len} bytes)")]
    LengthOverflow { field: &'static str, len: usize },

    /// Bytes left over after a complete structure.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

impl CodecError {
    pub(crate) fn invalid(field: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            detail: detail.into(),
        }
    }
}
