//! PGC Benchmarks
//!
//! Allocation throughput and full-cycle cost for both strategies across
//! worker counts.
//! Run with: `cargo bench --package pgc`

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use pgc::{CollectionStrategy, Collector, GcConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const STRATEGIES: [CollectionStrategy; 2] =
    [CollectionStrategy::MarkSweep, CollectionStrategy::Copying];

fn create_gc(strategy: CollectionStrategy, workers: usize) -> Collector {
    let config = GcConfig {
        strategy,
        heap_size: 4 * 1024 * 1024,
        worker_threads: workers,
        ..Default::default()
    };
    Collector::new(config).unwrap()
}

/// Complete binary tree of pairs with scalar leaves, left on the root stack
fn build_tree(gc: &Collector, depth: u32) {
    if depth == 0 {
        gc.create_scalar(depth as i64).unwrap();
        return;
    }
    build_tree(gc, depth - 1);
    build_tree(gc, depth - 1);
    let roots = gc.roots();
    let n = roots.len();
    gc.create_pair(Some(roots[n - 2]), Some(roots[n - 1])).unwrap();
}

/// Random graph over `nodes` objects; leaves `roots` of them rooted
fn build_random_graph(gc: &Collector, rng: &mut StdRng, nodes: usize, roots: usize) {
    let mut refs = Vec::with_capacity(nodes);
    for i in 0..nodes {
        let r = if i == 0 || rng.gen_bool(0.3) {
            gc.create_scalar(i as i64).unwrap()
        } else {
            let first = refs[rng.gen_range(0..i)];
            let second = refs[rng.gen_range(0..i)];
            gc.create_pair(Some(first), Some(second)).unwrap()
        };
        refs.push(r);
    }
    while gc.pop_root().is_some() {}
    for _ in 0..roots {
        gc.push_root(refs[rng.gen_range(0..nodes)]).unwrap();
    }
}

fn bench_gc_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_creation");

    for workers in [1, 4] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &w| {
            b.iter(|| black_box(create_gc(CollectionStrategy::MarkSweep, w)))
        });
    }

    group.finish();
}

fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation");
    group.throughput(Throughput::Elements(1));

    for strategy in STRATEGIES {
        let gc = create_gc(strategy, 2);
        group.bench_function(BenchmarkId::new("scalar", strategy), |b| {
            b.iter(|| {
                black_box(gc.create_scalar(7).unwrap());
                gc.pop_root();
            })
        });

        // Bury the leaf so create_pair does not consume it
        gc.create_scalar(1).unwrap();
        gc.create_scalar(2).unwrap();
        group.bench_function(BenchmarkId::new("pair", strategy), |b| {
            b.iter(|| {
                let leaf = gc.roots()[0];
                black_box(gc.create_pair(Some(leaf), None).unwrap());
                gc.pop_root();
            })
        });
    }

    group.finish();
}

fn bench_collect_live_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_live_tree");
    group.sample_size(30);

    for strategy in STRATEGIES {
        for workers in [1, 2, 4] {
            let gc = create_gc(strategy, workers);
            build_tree(&gc, 10);
            group.throughput(Throughput::Elements(gc.heap_stats().objects as u64));

            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), workers),
                &workers,
                |b, _| b.iter(|| black_box(gc.collect().unwrap())),
            );
        }
    }

    group.finish();
}

fn bench_collect_garbage(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_garbage");
    group.sample_size(30);

    for strategy in STRATEGIES {
        let gc = create_gc(strategy, 2);
        group.bench_function(strategy.to_string(), |b| {
            b.iter_batched(
                || {
                    build_tree(&gc, 8);
                    gc.pop_root();
                },
                |_| black_box(gc.collect().unwrap()),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_random_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_graph");
    group.sample_size(20);

    for strategy in STRATEGIES {
        for workers in [1, 4] {
            let gc = create_gc(strategy, workers);
            let mut rng = StdRng::seed_from_u64(42);

            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), workers),
                &workers,
                |b, _| {
                    b.iter_batched(
                        || {
                            while gc.pop_root().is_some() {}
                            build_random_graph(&gc, &mut rng, 2000, 16)
                        },
                        |_| black_box(gc.collect().unwrap()),
                        BatchSize::SmallInput,
                    )
                },
            );
        }
    }

    group.finish();
}

fn bench_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace");

    for workers in [1, 2, 4] {
        let gc = create_gc(CollectionStrategy::MarkSweep, workers);
        build_tree(&gc, 10);

        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, _| {
            b.iter(|| black_box(gc.trace().unwrap()))
        });
    }

    group.finish();
}

fn bench_config_validation(c: &mut Criterion) {
    c.bench_function("config_validation", |b| {
        let config = GcConfig::default();
        b.iter(|| black_box(config.validate()))
    });
}

criterion_group!(
    benches,
    bench_gc_creation,
    bench_allocation,
    bench_collect_live_tree,
    bench_collect_garbage,
    bench_random_graph,
    bench_trace,
    bench_config_validation
);
criterion_main!(benches);
