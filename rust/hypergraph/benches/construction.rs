// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Benchmark for bulk construction and stats materialization.
//!
//! Compares:
//! 1. Edge-by-edge insertion - baseline
//! 2. Bulk insertion from an edge list
//! 3. Degree and clustering materialization over the result
//!
//! Run with: cargo bench -p hyperlite-hypergraph --bench construction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hyperlite_hypergraph::Hypergraph;

/// Deterministic edge list with a mix of small and large edges.
fn generate_edges(edge_count: usize, node_count: i64, max_size: usize) -> Vec<Vec<i64>> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..edge_count)
        .map(|_| {
            let size = 2 + (next() as usize) % (max_size - 1);
            (0..size).map(|_| (next() % node_count as u64) as i64).collect()
        })
        .collect()
}

fn build_incrementally(edges: &[Vec<i64>]) -> Hypergraph {
    let mut hg = Hypergraph::new();
    for members in edges {
        hg.add_edge(members.iter().copied()).unwrap();
    }
    hg
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    let scenarios = [
        // (edges, nodes, max edge size, name)
        (1_000, 500, 4, "1k_edges_small"),
        (10_000, 5_000, 4, "10k_edges_small"),
        (10_000, 2_000, 12, "10k_edges_large"),
        (100_000, 50_000, 6, "100k_edges"),
    ];

    for (edge_count, node_count, max_size, name) in scenarios {
        let edges = generate_edges(edge_count, node_count, max_size);
        let incidences: usize = edges.iter().map(Vec::len).sum();
        group.throughput(Throughput::Elements(incidences as u64));

        group.bench_with_input(BenchmarkId::new("incremental", name), &edges, |b, edges| {
            b.iter(|| build_incrementally(black_box(edges)))
        });

        group.bench_with_input(BenchmarkId::new("bulk", name), &edges, |b, edges| {
            b.iter(|| Hypergraph::from_edge_list(black_box(edges.clone())).unwrap())
        });
    }

    group.finish();
}

fn bench_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats");

    for (edge_count, node_count, name) in [(10_000, 5_000, "10k_edges"), (100_000, 50_000, "100k_edges")] {
        let hg = Hypergraph::from_edge_list(generate_edges(edge_count, node_count, 6)).unwrap();
        group.throughput(Throughput::Elements(hg.num_nodes() as u64));

        group.bench_with_input(BenchmarkId::new("degree_mean", name), &hg, |b, hg| {
            b.iter(|| hg.nodes().degree().mean(black_box(hg)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("clustering", name), &hg, |b, hg| {
            b.iter(|| hg.nodes().clustering().asarray(black_box(hg)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("filterby_degree", name), &hg, |b, hg| {
            b.iter(|| hg.nodes().filterby(black_box(hg), "degree", 3).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_construction, bench_stats);
criterion_main!(benches);
