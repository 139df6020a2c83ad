//! Reduction benchmarks.
//!
//! Compares building a union with `apply` and reducing it afterwards against
//! the fused `apply_reduce`, on random zones of growing dimension, and the
//! depth-first `reduce` against the level-by-level `bf_reduce`.
//!
//! Run with:
//! ```bash
//! cargo bench --bench apply_reduce
//! ```

use cdd_rs::cdd::{Cdd, CddConfig, Op};
use cdd_rs::gen::random_dbm;
use cdd_rs::reference::Ref;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn manager(dim: usize) -> Cdd {
    let config = CddConfig::default()
        .with_node_capacity(1 << 18)
        .with_cache_capacity(1 << 16);
    let cdd = Cdd::new(config);
    cdd.add_clocks(dim);
    cdd
}

/// Builds `count` zone diagrams with a fixed seed.
fn random_zones(cdd: &Cdd, dim: usize, count: usize, seed: u64) -> Vec<Ref> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let range = rng.gen_range(1..=1000);
            let (dbm, _) = random_dbm(&mut rng, dim, range);
            cdd.from_dbm(&dbm).unwrap()
        })
        .collect()
}

// ============================================================================
// Benchmark: union of zones, apply then reduce
// ============================================================================

fn bench_apply_then_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdd/apply_then_reduce");
    group.sample_size(10);

    for dim in [2, 3, 4, 5] {
        group.bench_with_input(BenchmarkId::new("zones=16", dim), &dim, |b, &dim| {
            b.iter(|| {
                let cdd = manager(dim);
                let zones = random_zones(&cdd, dim, 16, 42);
                let f = zones.iter().fold(cdd.zero(), |acc, &z| cdd.reduce(cdd.apply_or(acc, z)));
                cdd.size(f)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: union of zones, fused apply_reduce
// ============================================================================

fn bench_apply_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdd/apply_reduce");
    group.sample_size(10);

    for dim in [2, 3, 4, 5] {
        group.bench_with_input(BenchmarkId::new("zones=16", dim), &dim, |b, &dim| {
            b.iter(|| {
                let cdd = manager(dim);
                let zones = random_zones(&cdd, dim, 16, 42);
                let f = zones.iter().fold(cdd.zero(), |acc, &z| cdd.apply_reduce(Op::Or, acc, z));
                cdd.size(f)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: reduce a union built without reduction
// ============================================================================

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdd/reduce");
    group.sample_size(10);

    for count in [4, 8, 12] {
        group.bench_with_input(BenchmarkId::new("dim=4", count), &count, |b, &count| {
            b.iter(|| {
                let cdd = manager(4);
                let zones = random_zones(&cdd, 4, count, 7);
                let f = zones.iter().fold(cdd.zero(), |acc, &z| cdd.apply_or(acc, z));
                let r = cdd.reduce(f);
                let cache = cdd.cache();
                (r, cache.hits(), cache.misses())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: same union, level-by-level reduction
// ============================================================================

fn bench_bf_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdd/bf_reduce");
    group.sample_size(10);

    for count in [4, 8, 12] {
        group.bench_with_input(BenchmarkId::new("dim=4", count), &count, |b, &count| {
            b.iter(|| {
                let cdd = manager(4);
                let zones = random_zones(&cdd, 4, count, 7);
                let f = zones.iter().fold(cdd.zero(), |acc, &z| cdd.apply_or(acc, z));
                cdd.bf_reduce(f)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_apply_then_reduce,
    bench_apply_reduce,
    bench_reduce,
    bench_bf_reduce
);
criterion_main!(benches);
