//! Packed R-tree benchmarks

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use roadtree::{FixedCoordinate, RoadSegment, StaticRTree};
use tempfile::tempdir;

fn fixture(n: usize) -> (Vec<RoadSegment>, Arc<[FixedCoordinate]>) {
    let mut coords = Vec::with_capacity(2 * n);
    let mut segments = Vec::with_capacity(n);
    for i in 0..n {
        let lat = (i % 1000) as i32 * 1_000;
        let lon = (i / 1000) as i32 * 1_000;
        coords.push(FixedCoordinate::new(lat, lon));
        coords.push(FixedCoordinate::new(lat + 500, lon + 500));
        segments.push(RoadSegment {
            u: (2 * i) as u32,
            v: (2 * i + 1) as u32,
            forward_node_id: i as u32,
            reverse_node_id: i as u32,
            forward_weight: 100,
            reverse_weight: 100,
            ..RoadSegment::default()
        });
    }
    (segments, coords.into())
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("StaticRTree Build");
    group.sample_size(10);

    for size in [1_000usize, 10_000, 100_000].iter() {
        let (segments, coords) = fixture(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter_with_setup(|| tempdir().unwrap(), |dir| {
                let index = StaticRTree::build(
                    &segments,
                    Arc::clone(&coords),
                    &dir.path().join("bench.tree"),
                    &dir.path().join("bench.leaves"),
                )
                .unwrap();
                black_box(index.tree_len())
            });
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("StaticRTree Query");

    let dir = tempdir().unwrap();
    let (segments, coords) = fixture(100_000);
    let index = StaticRTree::build(
        &segments,
        coords,
        &dir.path().join("bench.tree"),
        &dir.path().join("bench.leaves"),
    )
    .unwrap();

    group.bench_function("locate_closest_endpoint", |b| {
        let query = FixedCoordinate::new(123_456, 54_321);
        b.iter(|| black_box(index.locate_closest_endpoint(query, 18)));
    });

    group.bench_function("find_phantom_node", |b| {
        let query = FixedCoordinate::new(123_456, 54_321);
        b.iter(|| black_box(index.find_phantom_node(query, 18)));
    });

    group.bench_function("find_phantom_nodes_k5", |b| {
        let query = FixedCoordinate::new(123_456, 54_321);
        b.iter(|| black_box(index.find_phantom_nodes(query, 18, 5, None)));
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_queries);
criterion_main!(benches);
