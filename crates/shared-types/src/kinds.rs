//! # Kind Registry
//!
//! Maps kind ids to their data model. Usages register kinds; everything that
//! frames or stores values asks the registry which model applies.

use crate::data_model::{DataModel, KindId};
use std::collections::HashMap;

/// Kind ids defined by the base protocol and its usages.
pub mod well_known {
    use crate::data_model::KindId;

    pub const SIP_REGISTRATION: KindId = 1;
    pub const TURN_SERVICE: KindId = 2;
    pub const CERTIFICATE_BY_NODE: KindId = 3;
    pub const CERTIFICATE_BY_USER: KindId = 16;
    pub const REDIR: KindId = 104;
}

/// Default per-value size limit.
pub const DEFAULT_MAX_VALUE_SIZE: usize = 64 * 1024;

/// Registration of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDefinition {
    pub id: KindId,
    pub name: String,
    pub data_model: DataModel,
    /// Largest accepted payload in bytes.
    pub max_value_size: usize,
}

impl KindDefinition {
    /// Definition with the default size limit.
    #[must_use]
    pub fn new(id: KindId, name: impl Into<String>, data_model: DataModel) -> Self {
        Self {
            id,
            name: name.into(),
            data_model,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }

    /// Override the size limit.
    #[must_use]
    pub fn with_max_value_size(mut self, max_value_size: usize) -> Self {
        self.max_value_size = max_value_size;
        self
    }
}

/// Lookup of kind metadata.
pub trait KindRegistry: Send + Sync {
    /// Data model of `kind`, or `None` if the kind is not registered.
    fn data_model_of(&self, kind: KindId) -> Option<DataModel>;

    /// Size limit for values of `kind`.
    fn max_value_size(&self, kind: KindId) -> Option<usize>;
}

/// Registry fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticKindRegistry {
    kinds: HashMap<KindId, KindDefinition>,
}

impl StaticKindRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the base kinds and `REDIR`.
    #[must_use]
    pub fn with_base_kinds() -> Self {
        Self::new()
            .with_kind(KindDefinition::new(
                well_known::SIP_REGISTRATION,
                "SIP-REGISTRATION",
                DataModel::Dictionary,
            ))
            .with_kind(KindDefinition::new(
                well_known::TURN_SERVICE,
                "TURN-SERVICE",
                DataModel::SingleValue,
            ))
            .with_kind(KindDefinition::new(
                well_known::CERTIFICATE_BY_NODE,
                "CERTIFICATE_BY_NODE",
                DataModel::Array,
            ))
            .with_kind(KindDefinition::new(
                well_known::CERTIFICATE_BY_USER,
                "CERTIFICATE_BY_USER",
                DataModel::Array,
            ))
            .with_kind(KindDefinition::new(
                well_known::REDIR,
                "REDIR",
                DataModel::Dictionary,
            ))
    }

    /// Add or replace a kind.
    #[must_use]
    pub fn with_kind(mut self, definition: KindDefinition) -> Self {
        self.kinds.insert(definition.id, definition);
        self
    }

    /// Full definition of `kind`.
    #[must_use]
    pub fn definition(&self, kind: KindId) -> Option<&KindDefinition> {
        self.kinds.get(&kind)
    }
}

impl KindRegistry for StaticKindRegistry {
    fn data_model_of(&self, kind: KindId) -> Option<DataModel> {
        self.kinds.get(&kind).map(|d| d.data_model)
    }

    fn max_value_size(&self, kind: KindId) -> Option<usize> {
        self.kinds.get(&kind).map(|d| d.max_value_size)
    }
}
