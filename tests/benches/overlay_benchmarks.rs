//! # RELOAD Overlay Benchmarks
//!
//! | Component | Path measured |
//! |-----------|---------------|
//! | shared-types codec | Store request encode and decode |
//! | rl-01 Storage | Signed store, dictionary fetch, expiry sweep |
//! | rl-03 ReDiR | Bucket index and bucket resource derivation |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use rl_01_storage::{
    StorageApi, StorageConfig, StorageDependencies, StorageEngine, SystemTimeSource,
};
use rl_03_redir::{bucket_resource, partition_index};
use shared_bus::NoopPublisher;
use shared_types::codec::{decode_message, encode_message};
use shared_types::{
    now_millis, well_known, DataValue, Destination, HmacAccessController, HmacSecurityBlock,
    Message, MessageBody, NodeId, ResourceId, StaticKindRegistry, StoreKindData, StoreRequest,
    StoredData, StoredDataSpecifier, StoredValue, ID_LEN,
};
use std::sync::Arc;
use std::time::Duration;

fn random_node() -> NodeId {
    NodeId::new(rand::thread_rng().gen::<[u8; ID_LEN]>())
}

fn registrations(count: usize, payload: usize) -> StoreKindData {
    let values = (0..count)
        .map(|i| {
            StoredData::new(
                now_millis(),
                3600,
                StoredValue::Dictionary {
                    key: format!("contact-{i}"),
                    value: DataValue::new(vec![0xAB; payload]),
                },
            )
        })
        .collect();
    StoreKindData::new(well_known::SIP_REGISTRATION, 1, values)
}

fn engine() -> StorageEngine {
    let security = Arc::new(HmacSecurityBlock::new(random_node(), b"bench-overlay".to_vec()));
    StorageEngine::new(
        StorageDependencies {
            registry: Arc::new(StaticKindRegistry::with_base_kinds()),
            access: Arc::new(HmacAccessController::new(security.clone())),
            signer: security,
            events: Arc::new(NoopPublisher),
            time_source: Arc::new(SystemTimeSource),
        },
        StorageConfig::default(),
    )
}

// ============================================================================
// Codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.measurement_time(Duration::from_secs(5));
    let registry = StaticKindRegistry::with_base_kinds();

    for count in [1usize, 16, 128] {
        let resource = ResourceId::from_name("bench");
        let message = Message::request(
            random_node(),
            7,
            vec![Destination::Resource(resource)],
            MessageBody::StoreReq(StoreRequest {
                resource,
                replica_number: 0,
                kind_data: vec![registrations(count, 256)],
            }),
        );
        let bytes = encode_message(&message).unwrap();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode_store", count), &message, |b, m| {
            b.iter(|| black_box(encode_message(m).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode_store", count), &bytes, |b, raw| {
            b.iter(|| black_box(decode_message(raw, &registry).unwrap()))
        });
    }
    group.finish();
}

// ============================================================================
// Storage engine
// ============================================================================

fn bench_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("rl-01-storage");

    group.bench_function("store_signed_16", |b| {
        let engine = engine();
        let batch = [registrations(16, 128)];
        b.iter(|| {
            let resource = ResourceId::new(rand::thread_rng().gen());
            black_box(engine.store(resource, &batch).unwrap())
        })
    });

    let engine = engine();
    let resource = ResourceId::from_name("populated");
    engine
        .store(resource, &[registrations(1_000, 64)])
        .unwrap();
    let one_key = StoredDataSpecifier::dictionary(
        well_known::SIP_REGISTRATION,
        vec!["contact-500".to_string()],
    );
    let all_keys = StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec![]);

    group.bench_function("fetch_one_of_1000", |b| {
        b.iter(|| black_box(engine.fetch(&resource, &one_key).unwrap()))
    });
    group.bench_function("fetch_all_1000", |b| {
        b.iter(|| black_box(engine.fetch(&resource, &all_keys).unwrap()))
    });
    group.bench_function("sweep_nothing_expired", |b| {
        b.iter(|| black_box(engine.sweep_expired(now_millis())))
    });
    group.finish();
}

// ============================================================================
// ReDiR partitioning
// ============================================================================

fn bench_redir(c: &mut Criterion) {
    let mut group = c.benchmark_group("rl-03-redir");
    let ids: Vec<NodeId> = (0..256).map(|_| random_node()).collect();

    group.throughput(Throughput::Elements(ids.len() as u64));
    group.bench_function("partition_index_all_levels", |b| {
        b.iter(|| {
            for id in &ids {
                for level in 0..=16 {
                    black_box(partition_index(level, id.as_identifier()));
                }
            }
        })
    });
    group.bench_function("bucket_resource", |b| {
        b.iter(|| {
            for index in 0..256u64 {
                black_box(bucket_resource("gateways", 8, index));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_codec, bench_storage, bench_redir);
criterion_main!(benches);
