//! # Stored Data Model
//!
//! Values held under a resource are grouped by kind. Every kind declares one
//! of three data models and every stored value carries the variant for that
//! model:
//!
//! | Model | Slot | Addressed by |
//! |-------|------|--------------|
//! | `SingleValue` | one value | nothing |
//! | `Array` | sparse indexed values | `u32` index, ranges on fetch |
//! | `Dictionary` | keyed values | string key, key list on fetch |
//!
//! A value with `exists == false` is a tombstone: it records that the slot was
//! deleted without erasing the storage time and lifetime of the deletion.

use crate::errors::DataModelError;

/// Numeric kind identifier.
pub type KindId = u32;

/// Array index meaning "append after the highest stored index".
pub const APPEND_INDEX: u32 = u32::MAX;

/// Data model of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataModel {
    /// Exactly one value.
    SingleValue,
    /// Sparse array of values.
    Array,
    /// String-keyed values.
    Dictionary,
}

impl DataModel {
    /// Wire code.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::SingleValue => 1,
            Self::Array => 2,
            Self::Dictionary => 3,
        }
    }

    /// Decode a wire code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::SingleValue),
            2 => Some(Self::Array),
            3 => Some(Self::Dictionary),
            _ => None,
        }
    }
}

/// Presence flag plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataValue {
    /// `false` marks a tombstone.
    pub exists: bool,
    /// Opaque payload, empty for tombstones.
    pub value: Vec<u8>,
}

impl DataValue {
    /// A live value.
    #[must_use]
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            exists: true,
            value: value.into(),
        }
    }

    /// A deletion marker.
    #[must_use]
    pub fn tombstone() -> Self {
        Self {
            exists: false,
            value: Vec::new(),
        }
    }
}

/// A stored value tagged with its data model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// Value of a single-value kind.
    Single(DataValue),
    /// Entry of an array kind.
    Array { index: u32, value: DataValue },
    /// Entry of a dictionary kind.
    Dictionary { key: String, value: DataValue },
}

impl StoredValue {
    /// The data model this variant belongs to.
    #[must_use]
    pub fn data_model(&self) -> DataModel {
        match self {
            Self::Single(_) => DataModel::SingleValue,
            Self::Array { .. } => DataModel::Array,
            Self::Dictionary { .. } => DataModel::Dictionary,
        }
    }

    /// The presence flag and payload.
    #[must_use]
    pub fn data_value(&self) -> &DataValue {
        match self {
            Self::Single(v) | Self::Array { value: v, .. } | Self::Dictionary { value: v, .. } => v,
        }
    }

    /// Whether this is a deletion marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        !self.data_value().exists
    }
}

/// One stored value with its timing and signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredData {
    /// Milliseconds since the Unix epoch at which the value was written.
    pub storage_time: u64,
    /// Seconds the value stays valid after `storage_time`.
    pub lifetime: u32,
    /// The value.
    pub value: StoredValue,
    /// Opaque signature; empty means unsigned.
    pub signature: Vec<u8>,
}

impl StoredData {
    /// Unsigned stored data.
    #[must_use]
    pub fn new(storage_time: u64, lifetime: u32, value: StoredValue) -> Self {
        Self {
            storage_time,
            lifetime,
            value,
            signature: Vec::new(),
        }
    }

    /// Whether a signature is attached.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Expiry instant in milliseconds since the epoch.
    #[must_use]
    pub fn expires_at(&self) -> u64 {
        self.storage_time
            .saturating_add(u64::from(self.lifetime).saturating_mul(1000))
    }

    /// Whether the value has expired at `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }
}

/// All values of one kind submitted or held under a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKindData {
    /// Kind of every value in `values`.
    pub kind: KindId,
    /// Writer's generation counter.
    pub generation: u64,
    /// The values.
    pub values: Vec<StoredData>,
}

impl StoreKindData {
    /// Bundle values for one kind.
    #[must_use]
    pub fn new(kind: KindId, generation: u64, values: Vec<StoredData>) -> Self {
        Self {
            kind,
            generation,
            values,
        }
    }
}

/// Inclusive index range of an array fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayRange {
    pub first: u32,
    pub last: u32,
}

impl ArrayRange {
    /// A range `[first, last]`.
    #[must_use]
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Whether `index` falls inside the range.
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        self.first <= index && index <= self.last
    }
}

/// Model-specific part of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSelector {
    /// The single slot.
    Single,
    /// Sorted, non-overlapping index ranges; empty selects every entry.
    Array(Vec<ArrayRange>),
    /// Keys to fetch; empty selects every entry.
    Dictionary(Vec<String>),
}

/// What to fetch for one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDataSpecifier {
    /// Kind to fetch.
    pub kind: KindId,
    /// Only answer if the stored generation is at least this.
    pub generation_floor: u64,
    /// Which entries.
    pub selector: DataSelector,
}

impl StoredDataSpecifier {
    /// Fetch the single slot of a single-value kind.
    #[must_use]
    pub fn single(kind: KindId) -> Self {
        Self {
            kind,
            generation_floor: 0,
            selector: DataSelector::Single,
        }
    }

    /// Fetch index ranges of an array kind.
    ///
    /// Ranges are sorted by their first index.
    ///
    /// # Errors
    ///
    /// - `InvalidRange` if any range has `first > last`
    /// - `Overlap` if two ranges share an index
    pub fn array(kind: KindId, mut ranges: Vec<ArrayRange>) -> Result<Self, DataModelError> {
        if let Some(bad) = ranges.iter().find(|r| r.first > r.last) {
            return Err(DataModelError::InvalidRange {
                first: bad.first,
                last: bad.last,
            });
        }
        ranges.sort_by_key(|r| r.first);
        for pair in ranges.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.first <= a.last {
                return Err(DataModelError::Overlap {
                    first_a: a.first,
                    last_a: a.last,
                    first_b: b.first,
                    last_b: b.last,
                });
            }
        }
        Ok(Self {
            kind,
            generation_floor: 0,
            selector: DataSelector::Array(ranges),
        })
    }

    /// Fetch keys of a dictionary kind; no keys fetches all of them.
    #[must_use]
    pub fn dictionary(kind: KindId, keys: Vec<String>) -> Self {
        Self {
            kind,
            generation_floor: 0,
            selector: DataSelector::Dictionary(keys),
        }
    }

    /// Set the generation floor.
    #[must_use]
    pub fn with_generation_floor(mut self, generation_floor: u64) -> Self {
        self.generation_floor = generation_floor;
        self
    }

    /// Data model the selector addresses.
    #[must_use]
    pub fn data_model(&self) -> DataModel {
        match self.selector {
            DataSelector::Single => DataModel::SingleValue,
            DataSelector::Array(_) => DataModel::Array,
            DataSelector::Dictionary(_) => DataModel::Dictionary,
        }
    }
}

/// Fetch result for one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchKindResponse {
    pub kind: KindId,
    /// Generation of the kind at the responding peer.
    pub generation: u64,
    pub values: Vec<StoredData>,
}
