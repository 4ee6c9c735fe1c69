// benches/benchmarks.rs — Performance benchmarks (criterion)
//
// Stage budgets to watch:
//   1. Co-occurrence scan at the 50k-event retention threshold
//   2. Recurring-time clustering over a month of events
//   3. Synergy exploration and scoring: 20 devices at depth 3 within 5 s

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use synergy_miner::core::types::{DeviceDescriptor, DeviceInventory, EventRecord, RelationshipIndex};
use synergy_miner::infra::config::{Config, SynergyConfig};
use synergy_miner::memory::embeddings::cosine_similarity;
use synergy_miner::memory::{EmbeddingCache, SqliteVectorStore, VectorStore};
use synergy_miner::patterns::{CooccurrenceDetector, TimeOfDayDetector};
use synergy_miner::provider::local::LocalBackend;
use synergy_miner::synergy::{ChainScorer, DeviceGraph, Explorer};

// ─── Helpers ────────────────────────────────────────────────────────────────

const DOMAINS: &[&str] = &["light", "switch", "binary_sensor", "sensor", "fan", "cover"];

/// N events over 30 days across `devices` devices, seeded and time-ordered.
fn synthetic_events(n: usize, devices: usize) -> Vec<EventRecord> {
    let mut rng = StdRng::seed_from_u64(42);
    let start = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    let span = 30 * 24 * 3600;
    let mut events: Vec<EventRecord> = (0..n)
        .map(|_| {
            let d = rng.gen_range(0..devices);
            let domain = DOMAINS[d % DOMAINS.len()];
            let t = start + Duration::seconds(rng.gen_range(0..span));
            EventRecord::new(format!("{domain}.device_{d}"), t, "on", domain)
        })
        .collect();
    events.sort_by_key(|e| e.timestamp);
    events
}

/// `n` devices spread over `areas` areas.
fn synthetic_home(n: usize, areas: usize) -> DeviceInventory {
    DeviceInventory::new((0..n).map(|d| {
        let domain = DOMAINS[d % DOMAINS.len()];
        DeviceDescriptor {
            device_id: format!("{domain}.device_{d}"),
            friendly_name: format!("{domain} {d}"),
            domain: domain.to_string(),
            area_id: Some(format!("area_{}", d % areas)),
            capabilities: BTreeSet::new(),
        }
    }))
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_cooccurrence(c: &mut Criterion) {
    let config = Config::default();
    let detector = CooccurrenceDetector::from_config(&config.discovery, &config.cooccurrence);
    let events = synthetic_events(50_000, 60);

    let mut group = c.benchmark_group("cooccurrence");
    group.sample_size(10);
    group.bench_function("detect_50k_events", |b| {
        b.iter(|| detector.detect(black_box(&events)))
    });
    let oversized = synthetic_events(80_000, 60);
    group.bench_function("retain_80k_events", |b| {
        b.iter(|| detector.retain(black_box(&oversized)).0.len())
    });
    group.finish();
}

fn bench_time_of_day(c: &mut Criterion) {
    let config = Config::default();
    let detector = TimeOfDayDetector::from_config(&config.discovery, &config.time_of_day);
    let events = synthetic_events(20_000, 40);

    c.bench_function("time_of_day_20k_events", |b| {
        b.iter(|| detector.detect(black_box(&events)))
    });
}

fn bench_synergy(c: &mut Criterion) {
    let inventory = synthetic_home(20, 4);
    let graph = DeviceGraph::build(&inventory, &[]);
    let relationships = RelationshipIndex::default();

    let mut group = c.benchmark_group("synergy");
    group.bench_function("explore_20_devices_depth_3", |b| {
        b.iter(|| Explorer::new(&graph, &relationships, 3, 500).explore().chains.len())
    });

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let chains = Explorer::new(&graph, &relationships, 3, 500).explore().chains;
    let config = SynergyConfig::default();
    group.sample_size(10);
    group.bench_function("score_20_devices_cold_cache", |b| {
        b.iter(|| {
            let cache = EmbeddingCache::new(200, None);
            let scorer = ChainScorer::new(Arc::new(LocalBackend::new(384)), &cache, &config);
            runtime.block_on(scorer.score(&graph, &chains, 20)).0.len()
        })
    });
    group.finish();
}

fn bench_vectors(c: &mut Criterion) {
    let backend = LocalBackend::new(384);
    let a = backend.embed("motion sensor in hallway, light in hallway");
    let b_vec = backend.embed("door sensor in entrance, lock in entrance");

    let mut group = c.benchmark_group("vectors");
    group.bench_function("embed_local_384d", |b| {
        b.iter(|| backend.embed(black_box("temperature sensor in bedroom, thermostat in bedroom")))
    });
    group.bench_function("cosine_similarity_384d", |b| {
        b.iter(|| cosine_similarity(black_box(&a), black_box(&b_vec)))
    });

    let store = SqliteVectorStore::in_memory().unwrap();
    let mut i = 0u64;
    group.bench_function("store_put_384d", |b| {
        b.iter(|| {
            i += 1;
            store.put(&format!("key{i}"), Some("hall"), &a).unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_cooccurrence,
    bench_time_of_day,
    bench_synergy,
    bench_vectors,
);
criterion_main!(benches);
