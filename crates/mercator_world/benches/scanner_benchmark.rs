//! Benchmark for column sampling performance.
//!
//! A region refresh resamples up to 65,536 columns, so per-column cost is
//! what bounds map latency after a large world change.
//!
//! Run with: cargo bench --package mercator_world --bench scanner_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mercator_core::RegionCoord;
use mercator_world::{ColumnSampler, MaterialRegistry, SurfaceScanner, SyntheticWorld};

fn prepared_world() -> SyntheticWorld {
    let mut world = SyntheticWorld::new(42);
    world.ensure_region(RegionCoord::new(0, 0));
    world
}

fn benchmark_single_column(c: &mut Criterion) {
    let world = prepared_world();
    let materials = MaterialRegistry::builtin();
    let scanner = SurfaceScanner::new(&world, &materials);

    c.bench_function("single_column_sample", |b| {
        let mut x = 0i32;
        b.iter(|| {
            x = (x + 1) & 255;
            black_box(scanner.sample(black_box(x), black_box(x / 2)))
        });
    });
}

fn benchmark_chunk_sample(c: &mut Criterion) {
    let world = prepared_world();
    let materials = MaterialRegistry::builtin();
    let scanner = SurfaceScanner::new(&world, &materials);

    let mut group = c.benchmark_group("chunk_sample");
    group.throughput(Throughput::Elements(16 * 16));
    group.bench_function("16x16_columns", |b| {
        b.iter(|| {
            for z in 0..16 {
                for x in 0..16 {
                    black_box(scanner.sample(x, z));
                }
            }
        });
    });
    group.finish();
}

fn benchmark_region_sample(c: &mut Criterion) {
    let world = prepared_world();
    let materials = MaterialRegistry::builtin();
    let scanner = SurfaceScanner::new(&world, &materials);

    let mut group = c.benchmark_group("region_sample");
    group.sample_size(10);
    group.throughput(Throughput::Elements(256 * 256));
    group.bench_function("256x256_columns", |b| {
        b.iter(|| {
            for z in 0..256 {
                for x in 0..256 {
                    black_box(scanner.sample(x, z));
                }
            }
        });
    });
    group.finish();
}

fn benchmark_chunk_generation(c: &mut Criterion) {
    c.bench_function("synthetic_chunk_generation", |b| {
        let mut world = SyntheticWorld::new(42);
        let mut n = 0i32;
        b.iter(|| {
            n = n.wrapping_add(1);
            world.ensure_chunk(mercator_core::ChunkCoord::new(n, n / 2));
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_single_column,
              benchmark_chunk_sample,
              benchmark_region_sample,
              benchmark_chunk_generation
}

criterion_main!(benches);
