//! # Resource Store
//!
//! Everything held under one resource id: per kind, a generation counter and
//! the values laid out according to the kind's data model.
//!
//! ## Invariants
//!
//! - A kind's model is fixed by its first write; later writes and queries
//!   using another model fail with `UnsupportedDataModel`.
//! - A write records the writer's generation and overwrites the addressed slot
//!   (last writer wins).
//! - Deletions are tombstones: the slot keeps the deletion's storage time and
//!   lifetime with an empty payload until the expiry sweep evicts it.

use crate::domain::errors::StorageError;
use shared_types::{
    DataModel, DataSelector, FetchKindResponse, KindId, StoreKindData, StoredData,
    StoredDataSpecifier, StoredValue, Timestamp, APPEND_INDEX,
};
use std::collections::BTreeMap;

/// Values of one kind, by data model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindValues {
    Single(Option<StoredData>),
    Array(BTreeMap<u32, StoredData>),
    Dictionary(BTreeMap<String, StoredData>),
}

impl KindValues {
    fn empty(model: DataModel) -> Self {
        match model {
            DataModel::SingleValue => Self::Single(None),
            DataModel::Array => Self::Array(BTreeMap::new()),
            DataModel::Dictionary => Self::Dictionary(BTreeMap::new()),
        }
    }

    fn data_model(&self) -> DataModel {
        match self {
            Self::Single(_) => DataModel::SingleValue,
            Self::Array(_) => DataModel::Array,
            Self::Dictionary(_) => DataModel::Dictionary,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Single(slot) => usize::from(slot.is_some()),
            Self::Array(map) => map.len(),
            Self::Dictionary(map) => map.len(),
        }
    }

    fn all(&self) -> Vec<StoredData> {
        match self {
            Self::Single(slot) => slot.iter().cloned().collect(),
            Self::Array(map) => map.values().cloned().collect(),
            Self::Dictionary(map) => map.values().cloned().collect(),
        }
    }

    fn retain_unexpired(&mut self, now_ms: Timestamp) -> usize {
        let before = self.len();
        match self {
            Self::Single(slot) => {
                if slot.as_ref().is_some_and(|d| d.is_expired(now_ms)) {
                    *slot = None;
                }
            }
            Self::Array(map) => map.retain(|_, d| !d.is_expired(now_ms)),
            Self::Dictionary(map) => map.retain(|_, d| !d.is_expired(now_ms)),
        }
        before - self.len()
    }
}

/// Generation counter plus values for one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindStore {
    generation: u64,
    values: KindValues,
}

impl KindStore {
    fn new(model: DataModel) -> Self {
        Self {
            generation: 0,
            values: KindValues::empty(model),
        }
    }

    /// Generation recorded by the last write.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Model the kind was created with.
    #[must_use]
    pub fn data_model(&self) -> DataModel {
        self.values.data_model()
    }

    /// Number of slots held, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no slot is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All kinds stored under one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStore {
    kinds: BTreeMap<KindId, KindStore>,
}

impl ResourceStore {
    /// An empty resource.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one value of `kind`, recording `generation`.
    ///
    /// Array writes at `APPEND_INDEX` land one past the highest index held.
    ///
    /// # Errors
    ///
    /// `UnsupportedDataModel` if the value's model differs from `model` or
    /// from the model the kind already uses here.
    pub fn add_stored_data(
        &mut self,
        kind: KindId,
        model: DataModel,
        mut data: StoredData,
        generation: u64,
    ) -> Result<(), StorageError> {
        let value_model = data.value.data_model();
        if value_model != model {
            return Err(StorageError::model_mismatch(kind, model, value_model));
        }
        let store = self.kind_store_mut(kind, model)?;

        normalize_tombstone(&mut data.value);

        match &mut store.values {
            KindValues::Single(slot) => *slot = Some(data),
            KindValues::Array(map) => {
                let next = map.keys().next_back().map_or(0, |last| last.saturating_add(1));
                let index = match &mut data.value {
                    StoredValue::Array { index, .. } => {
                        if *index == APPEND_INDEX {
                            *index = next;
                        }
                        *index
                    }
                    _ => return Err(StorageError::model_mismatch(kind, model, value_model)),
                };
                map.insert(index, data);
            }
            KindValues::Dictionary(map) => {
                let key = match &data.value {
                    StoredValue::Dictionary { key, .. } => key.clone(),
                    _ => return Err(StorageError::model_mismatch(kind, model, value_model)),
                };
                map.insert(key, data);
            }
        }
        store.generation = generation;
        Ok(())
    }

    /// Record `generation` for `kind` without writing a value.
    ///
    /// An empty kind is kept only until the next expiry sweep.
    ///
    /// # Errors
    ///
    /// `UnsupportedDataModel` if the kind already uses another model here.
    pub fn record_generation(
        &mut self,
        kind: KindId,
        model: DataModel,
        generation: u64,
    ) -> Result<(), StorageError> {
        self.kind_store_mut(kind, model)?.generation = generation;
        Ok(())
    }

    fn kind_store_mut(&mut self, kind: KindId, model: DataModel) -> Result<&mut KindStore, StorageError> {
        let store = self
            .kinds
            .entry(kind)
            .or_insert_with(|| KindStore::new(model));
        if store.data_model() != model {
            return Err(StorageError::model_mismatch(kind, store.data_model(), model));
        }
        Ok(store)
    }

    /// Generation of `kind`, if anything of that kind was ever stored.
    #[must_use]
    pub fn generation(&self, kind: KindId) -> Option<u64> {
        self.kinds.get(&kind).map(KindStore::generation)
    }

    /// The kind's store, if present.
    #[must_use]
    pub fn kind(&self, kind: KindId) -> Option<&KindStore> {
        self.kinds.get(&kind)
    }

    /// Answer a fetch specifier.
    ///
    /// A kind never stored here answers with generation 0 and no values. A
    /// generation floor above the stored generation also answers with no
    /// values. Tombstones are returned like live values.
    ///
    /// # Errors
    ///
    /// `UnsupportedDataModel` if the specifier's selector does not match the
    /// kind's model.
    pub fn query(&self, spec: &StoredDataSpecifier) -> Result<FetchKindResponse, StorageError> {
        let Some(store) = self.kinds.get(&spec.kind) else {
            return Ok(FetchKindResponse {
                kind: spec.kind,
                generation: 0,
                values: Vec::new(),
            });
        };
        let selector_model = spec.data_model();
        if selector_model != store.data_model() {
            return Err(StorageError::model_mismatch(
                spec.kind,
                store.data_model(),
                selector_model,
            ));
        }

        let values = if spec.generation_floor > store.generation {
            Vec::new()
        } else {
            select(&store.values, &spec.selector)
        };

        Ok(FetchKindResponse {
            kind: spec.kind,
            generation: store.generation,
            values,
        })
    }

    /// Snapshot of every kind, for replication.
    #[must_use]
    pub fn store_kind_data(&self) -> Vec<StoreKindData> {
        self.kinds
            .iter()
            .map(|(kind, store)| StoreKindData::new(*kind, store.generation, store.values.all()))
            .collect()
    }

    /// Evict values expired at `now_ms`; kinds left empty are dropped.
    ///
    /// Returns the number of values evicted.
    pub fn sweep_expired(&mut self, now_ms: Timestamp) -> usize {
        let mut evicted = 0;
        for store in self.kinds.values_mut() {
            evicted += store.values.retain_unexpired(now_ms);
        }
        self.kinds.retain(|_, store| !store.is_empty());
        evicted
    }

    /// Kinds held.
    pub fn kinds(&self) -> impl Iterator<Item = KindId> + '_ {
        self.kinds.keys().copied()
    }

    /// Total slots held across kinds.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.kinds.values().map(KindStore::len).sum()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn normalize_tombstone(value: &mut StoredValue) {
    let data_value = match value {
        StoredValue::Single(v)
        | StoredValue::Array { value: v, .. }
        | StoredValue::Dictionary { value: v, .. } => v,
    };
    if !data_value.exists {
        data_value.value.clear();
    }
}

fn select(values: &KindValues, selector: &DataSelector) -> Vec<StoredData> {
    match (values, selector) {
        (KindValues::Single(slot), DataSelector::Single) => slot.iter().cloned().collect(),
        (KindValues::Array(map), DataSelector::Array(ranges)) => {
            if ranges.is_empty() {
                return map.values().cloned().collect();
            }
            ranges
                .iter()
                .flat_map(|r| map.range(r.first..=r.last).map(|(_, d)| d.clone()))
                .collect()
        }
        (KindValues::Dictionary(map), DataSelector::Dictionary(keys)) => {
            if keys.is_empty() {
                return map.values().cloned().collect();
            }
            keys.iter().filter_map(|k| map.get(k).cloned()).collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ArrayRange, DataValue};

    const DICT: KindId = 10;
    const ARRAY: KindId = 11;
    const SINGLE: KindId = 12;

    fn dict(key: &str, payload: &[u8], time: u64) -> StoredData {
        StoredData::new(
            time,
            60,
            StoredValue::Dictionary {
                key: key.into(),
                value: DataValue::new(payload.to_vec()),
            },
        )
    }

    fn entry(index: u32, payload: &[u8]) -> StoredData {
        StoredData::new(
            0,
            60,
            StoredValue::Array {
                index,
                value: DataValue::new(payload.to_vec()),
            },
        )
    }

    #[test]
    fn test_last_writer_wins_and_generation_recorded() {
        let mut store = ResourceStore::new();
        store
            .add_stored_data(DICT, DataModel::Dictionary, dict("a", b"1", 1), 5)
            .unwrap();
        store
            .add_stored_data(DICT, DataModel::Dictionary, dict("a", b"2", 2), 3)
            .unwrap();

        let resp = store
            .query(&StoredDataSpecifier::dictionary(DICT, vec!["a".into()]))
            .unwrap();
        assert_eq!(resp.generation, 3);
        assert_eq!(resp.values.len(), 1);
        assert_eq!(resp.values[0].value.data_value().value, b"2".to_vec());
    }

    #[test]
    fn test_model_is_fixed_by_first_write() {
        let mut store = ResourceStore::new();
        store
            .add_stored_data(ARRAY, DataModel::Array, entry(0, b"x"), 1)
            .unwrap();
        let err = store
            .add_stored_data(ARRAY, DataModel::Dictionary, dict("k", b"v", 0), 2)
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedDataModel { kind: ARRAY, .. }));
    }

    #[test]
    fn test_array_append_and_range_query() {
        let mut store = ResourceStore::new();
        for (i, payload) in [b"a", b"b", b"c"].iter().enumerate() {
            store
                .add_stored_data(ARRAY, DataModel::Array, entry(i as u32 * 10, *payload), 1)
                .unwrap();
        }
        store
            .add_stored_data(ARRAY, DataModel::Array, entry(APPEND_INDEX, b"d"), 2)
            .unwrap();

        let spec = StoredDataSpecifier::array(
            ARRAY,
            vec![ArrayRange::new(0, 5), ArrayRange::new(15, 30)],
        )
        .unwrap();
        let resp = store.query(&spec).unwrap();
        let indices: Vec<u32> = resp
            .values
            .iter()
            .map(|d| match d.value {
                StoredValue::Array { index, .. } => index,
                _ => u32::MAX,
            })
            .collect();
        assert_eq!(indices, vec![0, 20, 21]);
    }

    #[test]
    fn test_single_value_tombstone_keeps_timing() {
        let mut store = ResourceStore::new();
        store
            .add_stored_data(
                SINGLE,
                DataModel::SingleValue,
                StoredData::new(100, 30, StoredValue::Single(DataValue::new(b"v".to_vec()))),
                1,
            )
            .unwrap();
        let mut deletion = StoredData::new(
            200,
            30,
            StoredValue::Single(DataValue {
                exists: false,
                value: b"ignored".to_vec(),
            }),
        );
        deletion.signature = vec![1];
        store
            .add_stored_data(SINGLE, DataModel::SingleValue, deletion, 2)
            .unwrap();

        let resp = store.query(&StoredDataSpecifier::single(SINGLE)).unwrap();
        assert_eq!(resp.values.len(), 1);
        let slot = &resp.values[0];
        assert!(slot.value.is_tombstone());
        assert!(slot.value.data_value().value.is_empty());
        assert_eq!((slot.storage_time, slot.lifetime), (200, 30));
    }

    #[test]
    fn test_generation_floor_hides_values() {
        let mut store = ResourceStore::new();
        store
            .add_stored_data(DICT, DataModel::Dictionary, dict("a", b"1", 0), 4)
            .unwrap();
        let resp = store
            .query(&StoredDataSpecifier::dictionary(DICT, vec![]).with_generation_floor(5))
            .unwrap();
        assert_eq!(resp.generation, 4);
        assert!(resp.values.is_empty());
    }

    #[test]
    fn test_query_unknown_kind_is_empty() {
        let store = ResourceStore::new();
        let resp = store.query(&StoredDataSpecifier::single(SINGLE)).unwrap();
        assert_eq!(resp.generation, 0);
        assert!(resp.values.is_empty());
    }

    #[test]
    fn test_sweep_evicts_expired_and_drops_empty_kinds() {
        let mut store = ResourceStore::new();
        store
            .add_stored_data(DICT, DataModel::Dictionary, dict("old", b"1", 0), 1)
            .unwrap();
        store
            .add_stored_data(DICT, DataModel::Dictionary, dict("new", b"2", 50_000), 1)
            .unwrap();
        store
            .add_stored_data(ARRAY, DataModel::Array, entry(0, b"x"), 1)
            .unwrap();

        // lifetime 60s: storage_time 0 expires at 60_000
        assert_eq!(store.sweep_expired(60_000), 2);
        assert_eq!(store.kinds().collect::<Vec<_>>(), vec![DICT]);
        assert_eq!(store.value_count(), 1);
    }

    #[test]
    fn test_dictionary_tombstone_visible_at_new_generation() {
        let mut store = ResourceStore::new();
        store
            .add_stored_data(DICT, DataModel::Dictionary, dict("bob", b"sip:bob", 10), 1)
            .unwrap();
        let deletion = StoredData::new(
            20,
            60,
            StoredValue::Dictionary {
                key: "bob".into(),
                value: DataValue::tombstone(),
            },
        );
        store
            .add_stored_data(DICT, DataModel::Dictionary, deletion, 2)
            .unwrap();

        let resp = store
            .query(&StoredDataSpecifier::dictionary(DICT, vec![]).with_generation_floor(2))
            .unwrap();
        assert_eq!(resp.generation, 2);
        assert_eq!(resp.values.len(), 1);
        let slot = &resp.values[0];
        assert!(slot.value.is_tombstone());
        assert!(matches!(&slot.value, StoredValue::Dictionary { key, .. } if key == "bob"));
        assert_eq!(slot.storage_time, 20);
    }

    #[test]
    fn test_array_slots_are_independent() {
        let mut store = ResourceStore::new();
        for (index, payload) in [(0, b"a"), (1, b"b"), (2, b"c")] {
            store
                .add_stored_data(ARRAY, DataModel::Array, entry(index, payload), 1)
                .unwrap();
        }
        store
            .add_stored_data(ARRAY, DataModel::Array, entry(1, b"B"), 2)
            .unwrap();
        let deletion = StoredData::new(
            0,
            60,
            StoredValue::Array {
                index: 2,
                value: DataValue::tombstone(),
            },
        );
        store
            .add_stored_data(ARRAY, DataModel::Array, deletion, 3)
            .unwrap();

        let at = |index: u32| {
            let spec =
                StoredDataSpecifier::array(ARRAY, vec![ArrayRange::new(index, index)]).unwrap();
            store.query(&spec).unwrap().values.remove(0)
        };
        assert_eq!(at(0).value.data_value().value, b"a".to_vec());
        assert_eq!(at(1).value.data_value().value, b"B".to_vec());
        assert!(at(2).value.is_tombstone());
        assert_eq!(store.kind(ARRAY).map(KindStore::len), Some(3));
    }

    #[test]
    fn test_record_generation_without_values() {
        let mut store = ResourceStore::new();
        store.record_generation(DICT, DataModel::Dictionary, 4).unwrap();
        assert_eq!(store.generation(DICT), Some(4));

        let err = store
            .record_generation(DICT, DataModel::Array, 5)
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedDataModel { kind: DICT, .. }));

        assert_eq!(store.sweep_expired(0), 0);
        assert!(store.is_empty());
    }
}
