//! Benchmarks for the generation engine — the core hot path.
//!
//! Measures throughput of `generate` across table shapes that stress
//! different parts of the executor: a plain entity table, a fact table
//! with fanout, and a table-level effect scaling fanout.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use datagen_core::generate;
use datagen_testutil::{ecommerce_dataset, promo_impression_dataset, two_table_dataset};

fn bench_entity_and_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/two_table");
    let dataset = two_table_dataset();

    for seed in [1u64, 2, 3] {
        group.bench_with_input(BenchmarkId::new("seed", seed), &seed, |b, &seed| {
            b.iter(|| generate(&dataset, seed, None).unwrap());
        });
    }
    group.finish();
}

fn bench_ecommerce(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/ecommerce");
    let dataset = ecommerce_dataset();
    let tables = generate(&dataset, 42, None).unwrap();
    let total_rows: usize = tables.values().map(|t| t.rows.len()).sum();

    group.throughput(Throughput::Elements(total_rows as u64));
    group.bench_function("full_dataset", |b| {
        b.iter(|| generate(&dataset, 42, None).unwrap());
    });
    group.finish();
}

fn bench_table_level_effect(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/table_effect");
    let dataset = promo_impression_dataset();

    group.bench_function("promo_impression", |b| {
        b.iter(|| generate(&dataset, 7, None).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_entity_and_fanout, bench_ecommerce, bench_table_level_effect);
criterion_main!(benches);
