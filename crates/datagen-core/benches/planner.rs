//! Benchmarks for the dependency planner — graph construction and
//! topological ordering, run separately from generation itself so
//! regressions in one don't hide in the other's numbers.

use criterion::{criterion_group, criterion_main, Criterion};

use datagen_core::graph::{self, DependencyGraph};
use datagen_testutil::{ecommerce_dataset, promo_impression_dataset, two_table_dataset};

fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner/construction");
    let two_table = two_table_dataset();
    let ecommerce = ecommerce_dataset();
    let promo = promo_impression_dataset();

    group.bench_function("two_table", |b| {
        b.iter(|| DependencyGraph::from_dataset(&two_table));
    });
    group.bench_function("ecommerce", |b| {
        b.iter(|| DependencyGraph::from_dataset(&ecommerce));
    });
    group.bench_function("table_effect", |b| {
        b.iter(|| DependencyGraph::from_dataset(&promo));
    });
    group.finish();
}

fn bench_topological_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner/toposort");
    let ecommerce = ecommerce_dataset();
    let graph = DependencyGraph::from_dataset(&ecommerce);

    group.bench_function("ecommerce", |b| {
        b.iter(|| graph::plan(&graph).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_graph_construction, bench_topological_sort);
criterion_main!(benches);
