//! Benchmark for the map engine hot paths.
//!
//! Resample and render dominate the cost of a world change; pack and unpack
//! bound how fast idle compression and store loads can run.
//!
//! Run with: cargo bench --package mercator_map --bench map_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use mercator_core::{ChunkCoord, MapConfig, RegionCoord};
use mercator_map::{
    ColorCompositor, GridOverlay, MemoryStore, PathOverlay, RegionCache, RegionTile, RenderContext,
};
use mercator_world::{BiomeRegistry, LightCurve, MaterialRegistry, SyntheticWorld};

fn prepared_world() -> SyntheticWorld {
    let mut world = SyntheticWorld::new(42);
    world.ensure_region(RegionCoord::new(0, 0));
    world
}

fn sampled_tile(world: &SyntheticWorld, materials: &MaterialRegistry) -> RegionTile {
    let tile = RegionTile::new(RegionCoord::new(0, 0), 0);
    tile.resample(world, materials, 0);
    tile
}

fn benchmark_region_resample(c: &mut Criterion) {
    let world = prepared_world();
    let materials = MaterialRegistry::builtin();
    let tile = RegionTile::new(RegionCoord::new(0, 0), 0);

    let mut group = c.benchmark_group("region_resample");
    group.sample_size(10);
    group.throughput(Throughput::Elements(256));
    group.bench_function("256_chunks", |b| {
        b.iter(|| {
            tile.mark_all_columns_stale(0);
            black_box(tile.resample(&world, &materials, 0))
        });
    });
    group.finish();
}

fn benchmark_region_render(c: &mut Criterion) {
    let world = prepared_world();
    let materials = Arc::new(MaterialRegistry::builtin());
    let tile = sampled_tile(&world, &materials);
    let compositor = ColorCompositor::new(materials, Arc::new(BiomeRegistry::builtin()));
    let options = MapConfig::default().render;
    let curve = LightCurve::default();
    let path = PathOverlay::new();
    let grid = GridOverlay::new();
    let ctx = RenderContext {
        compositor: &compositor,
        options: &options,
        curve: &curve,
        path: &path,
        grid: &grid,
        bottom_y: 0,
        top_y: 320,
    };

    let mut group = c.benchmark_group("region_render");
    group.sample_size(10);
    group.throughput(Throughput::Elements(256 * 256));
    group.bench_function("65536_pixels", |b| {
        b.iter(|| {
            tile.mark_all_pixels_stale();
            black_box(tile.render(&ctx))
        });
    });
    group.finish();
}

fn benchmark_single_chunk_update(c: &mut Criterion) {
    let world = prepared_world();
    let materials = MaterialRegistry::builtin();
    let tile = sampled_tile(&world, &materials);
    // Drain the initial full-region pixel backlog first.
    tile.mark_all_columns_stale(0);
    tile.resample(&world, &materials, 0);

    c.bench_function("chunk_change_resample", |b| {
        b.iter(|| {
            tile.mark_chunk_stale(ChunkCoord::new(8, 8), 0);
            black_box(tile.resample(&world, &materials, 0))
        });
    });
}

fn benchmark_pack_unpack(c: &mut Criterion) {
    let world = prepared_world();
    let materials = MaterialRegistry::builtin();
    let tile = sampled_tile(&world, &materials);
    let packed = tile.pack_bytes().unwrap_or_default();

    c.bench_function("tile_pack", |b| {
        b.iter(|| black_box(tile.pack_bytes()));
    });
    c.bench_function("tile_unpack", |b| {
        b.iter(|| mercator_map::tile::codec::unpack(black_box(&packed)));
    });
}

fn benchmark_cache_churn(c: &mut Criterion) {
    c.bench_function("cache_create_and_prune", |b| {
        let cache = RegionCache::new(Arc::new(MemoryStore::new()), 16);
        let mut n = 0i32;
        b.iter(|| {
            n = n.wrapping_add(1);
            cache.get_or_create(RegionCoord::new(n & 31, n >> 5 & 31), u64::from(n.unsigned_abs()));
            if n % 64 == 0 {
                black_box(cache.prune(0.0, 0.0, u64::from(n.unsigned_abs()), u64::MAX));
            }
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_region_resample,
              benchmark_region_render,
              benchmark_single_chunk_update,
              benchmark_pack_unpack,
              benchmark_cache_churn
}

criterion_main!(benches);
