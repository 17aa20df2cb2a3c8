#![allow(dead_code)]
use shared::*;

use criterion::{criterion_group, Criterion};
use std::hint::black_box;
use tracing::info;

fn benchmark_delete_points(_c: &mut Criterion) {
    info!("Setting up benchmark: delete_points");
    let positions = bench_positions_2d(BENCH_NUM_ITEMS);
    let items: Vec<u64> = (0..BENCH_NUM_ITEMS as u64).collect();
    let tree = filled_point_tree(BENCH_NUM_ITEMS);
    let mut cc = configure_criterion();
    cc.bench_function("delete_points", |b| {
        b.iter(|| {
            let mut tree = tree.clone();
            let removed = tree
                .delete_points(black_box(&items[..1000]), black_box(&positions[..1000]))
                .unwrap();
            black_box(removed)
        })
    });
}

fn benchmark_remove_nodes_cascade(_c: &mut Criterion) {
    info!("Setting up benchmark: remove_nodes_cascade");
    let graph = filled_spatial_graph(BENCH_NUM_ITEMS, BENCH_NUM_EDGES);
    let ids: Vec<u64> = (0..500).collect();
    let mut cc = configure_criterion();
    cc.bench_function("remove_nodes_cascade", |b| {
        b.iter(|| {
            let mut graph = graph.clone();
            graph.remove_nodes(black_box(&ids)).unwrap();
            black_box(graph.len())
        })
    });
}

criterion_group!(benches, benchmark_delete_points, benchmark_remove_nodes_cascade);
