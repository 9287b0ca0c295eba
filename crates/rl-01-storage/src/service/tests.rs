//! Tests for the storage engine service.

use super::*;
use crate::ports::outbound::ManualTimeSource;
use shared_bus::{EventFilter, InMemoryEventBus};
use shared_types::{
    well_known, DataValue, HmacAccessController, HmacSecurityBlock, KindDefinition, NodeId,
    PermissiveAccessController, StaticKindRegistry, StoredData, StoredValue, ID_LEN,
};

const TINY: KindId = 900;

fn node(b: u8) -> NodeId {
    let mut bytes = [0u8; ID_LEN];
    bytes[0] = b;
    NodeId::new(bytes)
}

fn registry() -> Arc<StaticKindRegistry> {
    Arc::new(
        StaticKindRegistry::with_base_kinds()
            .with_kind(KindDefinition::new(TINY, "tiny", DataModel::SingleValue).with_max_value_size(4)),
    )
}

struct Harness {
    engine: StorageEngine,
    bus: Arc<InMemoryEventBus>,
    clock: Arc<ManualTimeSource>,
    signer: Arc<HmacSecurityBlock>,
}

fn harness_with(access: Arc<dyn AccessController>) -> Harness {
    let bus = Arc::new(InMemoryEventBus::new());
    let clock = Arc::new(ManualTimeSource::new(1_000));
    let signer = Arc::new(HmacSecurityBlock::new(node(1), b"overlay".to_vec()));
    let engine = StorageEngine::new(
        StorageDependencies {
            registry: registry(),
            access,
            signer: signer.clone(),
            events: bus.clone(),
            time_source: clock.clone(),
        },
        StorageConfig::default(),
    );
    Harness {
        engine,
        bus,
        clock,
        signer,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(PermissiveAccessController))
}

fn registration(key: &str, payload: &[u8], time: u64, lifetime: u32) -> StoredData {
    StoredData::new(
        time,
        lifetime,
        StoredValue::Dictionary {
            key: key.to_string(),
            value: DataValue::new(payload.to_vec()),
        },
    )
}

fn sip(values: Vec<StoredData>, generation: u64) -> StoreKindData {
    StoreKindData::new(well_known::SIP_REGISTRATION, generation, values)
}

// =============================================================================
// STORE / FETCH
// =============================================================================

#[test]
fn test_store_then_fetch_returns_signed_value() {
    let h = harness();
    let resource = ResourceId::from_name("alice");
    let resp = h
        .engine
        .store(resource, &[sip(vec![registration("uri", b"sip:a", 1_000, 60)], 1)])
        .unwrap();
    assert_eq!(
        resp,
        vec![StoreKindResponse {
            kind: well_known::SIP_REGISTRATION,
            generation: 1
        }]
    );

    let fetched = h
        .engine
        .fetch(
            &resource,
            &StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec!["uri".into()]),
        )
        .unwrap()
        .unwrap();
    assert_eq!(fetched.values.len(), 1);
    assert!(fetched.values[0].is_signed());
    assert_eq!(
        HmacSecurityBlock::signer_of(&fetched.values[0].signature),
        Some(h.signer.identity())
    );
}

#[test]
fn test_fetch_unknown_resource_is_not_found() {
    let h = harness();
    let result = h
        .engine
        .fetch(
            &ResourceId::from_name("nobody"),
            &StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec![]),
        )
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_fetch_known_resource_with_no_match_is_found_and_empty() {
    let h = harness();
    let resource = ResourceId::from_name("alice");
    h.engine
        .store(resource, &[sip(vec![registration("uri", b"x", 1_000, 60)], 1)])
        .unwrap();

    let missing_key = h
        .engine
        .fetch(
            &resource,
            &StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec!["other".into()]),
        )
        .unwrap()
        .unwrap();
    assert!(missing_key.values.is_empty());

    let other_kind = h
        .engine
        .fetch(&resource, &StoredDataSpecifier::single(well_known::TURN_SERVICE))
        .unwrap()
        .unwrap();
    assert_eq!(other_kind.generation, 0);
    assert!(other_kind.values.is_empty());
}

#[test]
fn test_empty_dictionary_keys_fetch_everything() {
    let h = harness();
    let resource = ResourceId::from_name("alice");
    h.engine
        .store(
            resource,
            &[sip(
                vec![
                    registration("a", b"1", 1_000, 60),
                    registration("b", b"2", 1_000, 60),
                    registration("c", b"3", 1_000, 60),
                ],
                1,
            )],
        )
        .unwrap();
    let all = h
        .engine
        .fetch(
            &resource,
            &StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec![]),
        )
        .unwrap()
        .unwrap();
    assert_eq!(all.values.len(), 3);
}

#[test]
fn test_unknown_kind_is_unsupported() {
    let h = harness();
    let err = h
        .engine
        .store(
            ResourceId::from_name("r"),
            &[StoreKindData::new(4242, 0, vec![registration("k", b"v", 0, 1)])],
        )
        .unwrap_err();
    assert!(matches!(err, StorageError::UnsupportedDataModel { kind: 4242, .. }));
    assert!(h.engine.is_empty());
}

#[test]
fn test_oversized_value_rejected() {
    let h = harness();
    let err = h
        .engine
        .store(
            ResourceId::from_name("r"),
            &[StoreKindData::new(
                TINY,
                0,
                vec![StoredData::new(0, 1, StoredValue::Single(DataValue::new(vec![0; 5])))],
            )],
        )
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::DataTooLarge {
            kind: TINY,
            size: 5,
            limit: 4
        }
    );
}

#[test]
fn test_invalid_signature_denied_and_batch_not_applied() {
    let verifier = Arc::new(HmacSecurityBlock::new(node(9), b"overlay".to_vec()));
    let h = harness_with(Arc::new(HmacAccessController::new(verifier)));
    let resource = ResourceId::from_name("alice");

    let good = registration("good", b"1", 1_000, 60);
    let mut forged = registration("forged", b"2", 1_000, 60);
    forged.signature = vec![0xde; ID_LEN + 32];

    let err = h
        .engine
        .store(resource, &[sip(vec![good, forged], 1)])
        .unwrap_err();
    assert!(matches!(err, StorageError::AccessDenied { .. }));
    assert!(h
        .engine
        .fetch(
            &resource,
            &StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec![])
        )
        .unwrap()
        .is_none());
}

#[test]
fn test_generation_lookup() {
    let h = harness();
    let resource = ResourceId::from_name("alice");
    assert_eq!(
        h.engine.generation(&resource, well_known::SIP_REGISTRATION),
        Err(StorageError::ResourceNotFound(resource))
    );

    h.engine
        .store(resource, &[sip(vec![registration("a", b"1", 1_000, 60)], 7)])
        .unwrap();
    assert_eq!(
        h.engine.generation(&resource, well_known::SIP_REGISTRATION),
        Ok(7)
    );
    assert_eq!(
        h.engine.generation(&resource, well_known::TURN_SERVICE),
        Err(StorageError::KindNotFound {
            kind: well_known::TURN_SERVICE
        })
    );
}

#[test]
fn test_store_publishes_event() {
    let h = harness();
    let mut sub = h.bus.subscribe(EventFilter::all());
    let resource = ResourceId::from_name("alice");
    h.engine
        .store(resource, &[sip(vec![registration("a", b"1", 1_000, 60)], 2)])
        .unwrap();

    assert_eq!(
        sub.try_recv().unwrap(),
        Some(OverlayEvent::ResourceStored {
            resource_id: resource,
            kind: well_known::SIP_REGISTRATION,
            generation: 2,
            value_count: 1,
        })
    );
}

// =============================================================================
// ENUMERATION / REMOVAL
// =============================================================================

#[test]
fn test_enumerate_snapshot_and_remove() {
    let h = harness();
    let a = ResourceId::from_name("a");
    let b = ResourceId::from_name("b");
    h.engine
        .store(a, &[sip(vec![registration("k", b"1", 1_000, 60)], 1)])
        .unwrap();
    h.engine
        .store(b, &[sip(vec![registration("k", b"2", 1_000, 60)], 1)])
        .unwrap();

    let mut ids = h.engine.resource_ids();
    ids.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(ids, expected);

    let snapshot = h.engine.store_kind_data_for(&a).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].kind, well_known::SIP_REGISTRATION);
    assert_eq!(snapshot[0].values.len(), 1);

    assert!(h.engine.remove(&a));
    assert!(!h.engine.remove(&a));
    assert!(h.engine.store_kind_data_for(&a).is_none());
    assert_eq!(h.engine.len(), 1);
}

// =============================================================================
// EXPIRY
// =============================================================================

#[test]
fn test_sweep_removes_expired_values_and_empty_resources() {
    let h = harness();
    let short = ResourceId::from_name("short");
    let long = ResourceId::from_name("long");
    h.engine
        .store(short, &[sip(vec![registration("k", b"1", 1_000, 1)], 1)])
        .unwrap();
    h.engine
        .store(long, &[sip(vec![registration("k", b"2", 1_000, 3_600)], 1)])
        .unwrap();

    h.clock.advance(999);
    assert_eq!(h.engine.sweep_expired_now(), 0);

    h.clock.advance(1);
    assert_eq!(h.engine.sweep_expired_now(), 1);
    assert_eq!(h.engine.resource_ids(), vec![long]);
}

#[test]
fn test_replicated_values_expire_with_original_timing() {
    let h = harness();
    let resource = ResourceId::from_name("replica");
    // A replica arrives carrying the primary's storage time.
    h.engine
        .store(resource, &[sip(vec![registration("k", b"1", 0, 1)], 1)])
        .unwrap();
    assert_eq!(h.engine.sweep_expired_now(), 1);
    assert!(h.engine.is_empty());
}

#[test]
fn test_concurrent_stores_to_distinct_resources() {
    let h = harness();
    std::thread::scope(|scope| {
        for t in 0..4u8 {
            let engine = &h.engine;
            scope.spawn(move || {
                for i in 0..25u8 {
                    let id = ResourceId::from_name(&format!("r-{t}-{i}"));
                    engine
                        .store(id, &[sip(vec![registration("k", &[i], 1_000, 60)], 1)])
                        .unwrap();
                }
            });
        }
    });
    assert_eq!(h.engine.len(), 100);
}

#[test]
fn test_store_racing_sweep_is_never_lost() {
    let h = harness();
    let resource = ResourceId::from_name("contended");
    let now = 10_000_000;

    for round in 0..2_000u32 {
        h.engine
            .store(resource, &[sip(vec![registration("old", b"1", 1_000, 1)], 1)])
            .unwrap();
        let barrier = std::sync::Barrier::new(2);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                barrier.wait();
                h.engine.sweep_expired(now);
            });
            scope.spawn(|| {
                barrier.wait();
                h.engine
                    .store(resource, &[sip(vec![registration("new", b"2", now, 60)], 2)])
                    .unwrap();
            });
        });

        let found = h
            .engine
            .fetch(
                &resource,
                &StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec!["new".into()]),
            )
            .unwrap();
        assert_eq!(
            found.map(|resp| resp.values.len()),
            Some(1),
            "acknowledged store lost in round {round}"
        );
        h.engine.remove(&resource);
    }
}

#[test]
fn test_empty_batch_records_generation() {
    let h = harness();
    let resource = ResourceId::from_name("alice");
    h.engine
        .store(resource, &[sip(vec![registration("a", b"1", 1_000, 60)], 1)])
        .unwrap();

    let responses = h.engine.store(resource, &[sip(vec![], 6)]).unwrap();
    assert_eq!(responses[0].generation, 6);
    assert_eq!(
        h.engine.generation(&resource, well_known::SIP_REGISTRATION),
        Ok(6)
    );
}
