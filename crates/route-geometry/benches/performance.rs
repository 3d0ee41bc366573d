//! Performance benchmarks for route-geometry
//!
//! Run with: cargo bench --package route-geometry

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use route_geometry::{EngineConfig, PathPoint, PolylineCodec, Route, profile};
use std::hint::black_box;

/// Generate a realistic route with the specified number of points.
fn generate_path(num_points: usize, base_lat: f64, base_lng: f64) -> Vec<PathPoint> {
    (0..num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            let lat = base_lat + t * 0.5 + (t * 50.0).sin() * 0.001;
            let lng = base_lng + t * 0.5 + (t * 30.0).cos() * 0.001;
            let alt = 200.0 + (t * 20.0).sin() * 150.0 + (t * 400.0).sin() * 3.0;
            PathPoint::with_alt(lat, lng, alt)
        })
        .collect()
}

fn generate_route(num_points: usize) -> Route {
    Route::from_path(generate_path(num_points, 35.6, 139.7), EngineConfig::default()).unwrap()
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    let mut route = generate_route(50_000);
    group.throughput(Throughput::Elements(route.len() as u64));

    group.bench_function("set_weight_50k", |b| {
        b.iter(|| route.set_weight());
    });

    group.bench_function("set_distance_full_50k", |b| {
        let last = route.len() - 1;
        b.iter(|| route.set_distance(0, last).unwrap());
    });

    group.bench_function("set_distance_local_50k", |b| {
        b.iter(|| route.set_distance(25_000, 25_010).unwrap());
    });

    group.bench_function("set_smooth_50k", |b| {
        b.iter(|| {
            route.set_slope();
            route.set_smooth();
        });
    });

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("polyline");

    let path = generate_path(50_000, 35.6, 139.7);
    let codec = PolylineCodec::default();
    let encoded = codec.encode(&path).unwrap();

    group.throughput(Throughput::Elements(path.len() as u64));
    group.bench_function("encode_50k", |b| {
        b.iter(|| codec.encode(black_box(&path)).unwrap());
    });
    group.bench_function("decode_50k", |b| {
        b.iter(|| codec.decode(black_box(&encoded)).unwrap());
    });

    group.finish();
}

fn bench_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("profile");

    let route = generate_route(50_000);
    let samples = route.profile_samples();

    for buckets in [300usize, 1_200] {
        group.bench_with_input(
            BenchmarkId::new("rasterize_50k", buckets),
            &buckets,
            |b, &buckets| {
                b.iter(|| profile::rasterize(black_box(&samples), buckets).unwrap());
            },
        );
    }

    group.bench_function("course_bands_50k", |b| {
        b.iter(|| route.course_bands(100.0).unwrap().count());
    });

    group.finish();
}

fn bench_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("edits");
    group.sample_size(10);

    let route = generate_route(10_000);
    let detour: Vec<PathPoint> = generate_path(200, 35.7, 139.8);

    group.bench_function("subpath_replace_10k", |b| {
        b.iter_batched(
            || route.clone(),
            |mut route| route.subpath_replace(4_000, 4_199, &detour).unwrap(),
            criterion::BatchSize::LargeInput,
        );
    });

    group.bench_function("pack_unpack_10k", |b| {
        b.iter(|| {
            let snapshot = route.pack().unwrap();
            Route::unpack(&snapshot, EngineConfig::default()).unwrap()
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_pipeline, bench_codec, bench_profile, bench_edits);

criterion_main!(benches);
