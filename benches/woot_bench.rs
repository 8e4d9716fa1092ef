use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wootkit_core::crdt::woot::{Content, ContentId, Identifier, Insert, Operation};
use wootkit_core::{EngineConfig, MemoryClock, Patch, StateArchive, WootEngine};

fn cid() -> ContentId {
    ContentId::new("Main.WebHome", "doc", "content").unwrap()
}

/// Type `len` characters at the end of a fresh content, returning the ops
fn typed(site: &str, len: usize) -> (Content, Vec<Operation>) {
    let mut content = Content::new(cid());
    let mut ops = Vec::with_capacity(len);
    for i in 0..len {
        let (p, n) = content.insert_neighbors(i).unwrap();
        let op = Insert::between(&content, p, n, Identifier::new(site, i as u64 + 1), "a");
        op.apply(&mut content);
        ops.push(Operation::from(op));
    }
    (content, ops)
}

/// Benchmark sequential typing (simulates real user typing)
fn bench_sequential_typing(c: &mut Criterion) {
    let mut group = c.benchmark_group("woot_sequential_typing");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(typed("site1", size)));
        });
    }

    group.finish();
}

/// Benchmark remote integration of a burst into an empty replica
fn bench_remote_integration(c: &mut Criterion) {
    let (_, ops) = typed("site1", 1000);

    c.bench_function("woot_integrate_1000_remote_ops", |b| {
        b.iter(|| {
            let mut replica = Content::new(cid());
            for op in &ops {
                black_box(op.apply(&mut replica));
            }
        });
    });
}

/// Benchmark concurrent inserts into the same gap
fn bench_concurrent_convergence(c: &mut Criterion) {
    let (_, ops1) = typed("site1", 100);
    let (_, ops2) = typed("site2", 100);
    let (_, ops3) = typed("site3", 100);

    c.bench_function("woot_concurrent_3way_convergence", |b| {
        b.iter(|| {
            let mut replica = Content::new(cid());
            for op in ops3.iter().chain(&ops1).chain(&ops2) {
                op.apply(&mut replica);
            }
            assert_eq!(replica.size_of_visible(), 300);
        });
    });
}

/// Benchmark waiting-pool resolution with a fully reversed burst
fn bench_reverse_delivery(c: &mut Criterion) {
    let (_, ops) = typed("site1", 200);
    let reversed: Vec<Operation> = ops.into_iter().rev().collect();

    c.bench_function("woot_deliver_reversed_200", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let engine =
                    WootEngine::new(EngineConfig::new("site2", dir.path()), MemoryClock::new())
                        .unwrap();
                (dir, engine)
            },
            |(_dir, engine)| {
                let report = engine
                    .deliver_patch(&Patch::new(reversed.clone(), "Main.WebHome", "doc"))
                    .unwrap();
                assert_eq!(report.pending, 0);
            },
            criterion::BatchSize::PerIteration,
        );
    });
}

/// Benchmark page serialization
fn bench_serialization(c: &mut Criterion) {
    let (content, _) = typed("site1", 10000);

    c.bench_function("woot_serialize_10k_content", |b| {
        b.iter(|| black_box(serde_json::to_vec(&content).unwrap()));
    });
}

/// Benchmark state archive round trip
fn bench_state_archive(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let engine =
        WootEngine::new(EngineConfig::new("site1", dir.path()), MemoryClock::new()).unwrap();
    for page in 0..20 {
        let id = ContentId::new(format!("Page{}", page), "doc", "content").unwrap();
        let content = engine.load_content(&id).unwrap();
        engine.insert_text(&content, &"lorem ipsum ".repeat(20), 0).unwrap();
        engine.unload_content(&content).unwrap();
    }
    let bytes = engine.get_state().unwrap();

    c.bench_function("woot_state_archive_decode_20_pages", |b| {
        b.iter(|| black_box(StateArchive::decode(&bytes).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_sequential_typing,
    bench_remote_integration,
    bench_concurrent_convergence,
    bench_reverse_delivery,
    bench_serialization,
    bench_state_archive,
);

criterion_main!(benches);
