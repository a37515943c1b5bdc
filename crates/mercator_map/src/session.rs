//! # Map Session
//!
//! [`MapSession`] is the facade a host embeds: it owns the cache, the
//! resolver, the change pipeline and the render state, and exposes the
//! tick entry point plus queries and overlay controls. Every method takes
//! `&self`; the session is meant to sit in an `Arc` shared between the
//! host's tick loop, its UI and its event handlers.
//!
//! World attachment is polled: the session asks its [`WorldSource`] at a
//! fixed interval and, on a world switch, saves and drops every cached
//! tile before adopting the new world.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use mercator_core::{
    local_column, Argb, ChunkCoord, MapConfig, RegionCoord, RenderOptions, CHUNK_SIZE,
};
use mercator_world::{
    BiomeId, BiomeRegistry, BlockWorld, ColumnSample, LightCurve, MaterialId, MaterialRegistry,
    NO_HEIGHT,
};

use crate::cache::{PruneReport, RegionCache};
use crate::compositor::{ColorCompositor, RenderContext};
use crate::overlay::{GridOverlay, PathOverlay};
use crate::pipeline::ChangePipeline;
use crate::store::TileStore;
use crate::tracker::ChunkTracker;
use crate::viewport::{ResolvedView, ViewportResolver, ViewportWindow};

/// Supplies the session with the currently active world.
pub trait WorldSource: Send + Sync {
    /// The active world and its stable identifier, or `None` while no
    /// world is loaded.
    fn current(&self) -> Option<(String, Arc<dyn BlockWorld + Send + Sync>)>;
}

/// Thread-safe adapter exposing a mutable world to the engine.
///
/// The engine only ever reads through [`BlockWorld`]; a host that mutates
/// its world wraps it here and takes the write lock for edits.
pub struct SharedWorld<W> {
    inner: RwLock<W>,
}

impl<W: BlockWorld> SharedWorld<W> {
    /// Wraps a world.
    pub fn new(world: W) -> Self {
        Self {
            inner: RwLock::new(world),
        }
    }

    /// Runs a closure with mutable access to the world.
    pub fn edit<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl<W: BlockWorld> BlockWorld for SharedWorld<W> {
    fn bottom_y(&self) -> i16 {
        self.inner.read().bottom_y()
    }
    fn top_y(&self) -> i16 {
        self.inner.read().top_y()
    }
    fn material_at(&self, x: i32, y: i16, z: i32) -> MaterialId {
        self.inner.read().material_at(x, y, z)
    }
    fn block_light(&self, x: i32, y: i16, z: i32) -> u8 {
        self.inner.read().block_light(x, y, z)
    }
    fn sky_light(&self, x: i32, y: i16, z: i32) -> u8 {
        self.inner.read().sky_light(x, y, z)
    }
    fn motion_blocking_height(&self, x: i32, z: i32) -> i16 {
        self.inner.read().motion_blocking_height(x, z)
    }
    fn biome_at(&self, x: i32, z: i32) -> BiomeId {
        self.inner.read().biome_at(x, z)
    }
    fn chunk_present(&self, chunk: ChunkCoord) -> bool {
        self.inner.read().chunk_present(chunk)
    }
    fn roofed(&self) -> bool {
        self.inner.read().roofed()
    }
}

struct AttachedWorld {
    id: String,
    world: Arc<dyn BlockWorld + Send + Sync>,
}

/// The chunk and all eight neighbors are present.
fn chunk_surrounded(world: &dyn BlockWorld, chunk: ChunkCoord) -> bool {
    (-1..=1).all(|dz| {
        (-1..=1).all(|dx| world.chunk_present(ChunkCoord::new(chunk.x + dx, chunk.z + dz)))
    })
}

/// What one [`MapSession::on_tick`] did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Tick counter after this tick.
    pub tick: u64,
    /// Debounced chunk changes applied to cached tiles.
    pub changes_applied: usize,
    /// Chunks queued by the periodic refresh sweep.
    pub refreshed_chunks: usize,
    /// Prune results, when a prune request was consumed.
    pub prune: Option<PruneReport>,
    /// Tiles packed by idle compression outside a prune.
    pub compressed: usize,
}

/// What one [`MapSession::render_view`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Chunks whose columns were resampled.
    pub chunks_resampled: usize,
    /// Chunks whose pixels were recomposited.
    pub chunks_rendered: usize,
}

/// The map engine facade.
pub struct MapSession {
    source: Arc<dyn WorldSource>,
    config: RwLock<MapConfig>,
    cache: RegionCache,
    resolver: ViewportResolver,
    pipeline: ChangePipeline,
    tracker: Mutex<ChunkTracker>,
    compositor: ColorCompositor,
    materials: Arc<MaterialRegistry>,
    path: PathOverlay,
    grid: GridOverlay,
    curve: RwLock<LightCurve>,
    attached: RwLock<Option<AttachedWorld>>,
    player: Mutex<(f64, f64)>,
    view_center: Mutex<(f64, f64)>,
    /// Drained changes waiting for their chunk to become surrounded.
    parked: Mutex<Vec<ChunkCoord>>,
    /// While the map UI is hidden the view follows the player.
    follow_player: AtomicBool,
    last_world_check: AtomicU64,
    last_refresh: AtomicU64,
}

impl MapSession {
    /// Creates a session over a world source and a tile store.
    #[must_use]
    pub fn new(source: Arc<dyn WorldSource>, store: Arc<dyn TileStore>, config: MapConfig) -> Self {
        let materials = Arc::new(MaterialRegistry::builtin());
        let biomes = Arc::new(BiomeRegistry::builtin());
        let cache = RegionCache::new(store, config.cache_capacity_tiles);
        let pipeline = ChangePipeline::new(config.change_debounce_ticks);
        let tracker = ChunkTracker::new(config.periodic_refresh_radius.max(1));
        Self {
            source,
            config: RwLock::new(config),
            cache,
            resolver: ViewportResolver::new(),
            pipeline,
            tracker: Mutex::new(tracker),
            compositor: ColorCompositor::new(Arc::clone(&materials), biomes),
            materials,
            path: PathOverlay::new(),
            grid: GridOverlay::new(),
            curve: RwLock::new(LightCurve::default()),
            attached: RwLock::new(None),
            player: Mutex::new((0.0, 0.0)),
            view_center: Mutex::new((0.0, 0.0)),
            parked: Mutex::new(Vec::new()),
            follow_player: AtomicBool::new(true),
            last_world_check: AtomicU64::new(u64::MAX),
            last_refresh: AtomicU64::new(0),
        }
    }

    /// The tile cache. Exposed for diagnostics.
    #[must_use]
    pub fn cache(&self) -> &RegionCache {
        &self.cache
    }

    /// Identifier of the attached world, if any.
    #[must_use]
    pub fn attached_world_id(&self) -> Option<String> {
        self.attached.read().as_ref().map(|a| a.id.clone())
    }

    fn attached_world(&self) -> Option<Arc<dyn BlockWorld + Send + Sync>> {
        self.attached.read().as_ref().map(|a| Arc::clone(&a.world))
    }

    /// Polls the world source, attaching or switching worlds as needed.
    fn ensure_world(&self, now_ms: u64) -> Option<Arc<dyn BlockWorld + Send + Sync>> {
        let retry = self.config.read().world_retry_ms;
        let last = self.last_world_check.load(Ordering::Relaxed);
        if last != u64::MAX && now_ms.saturating_sub(last) < retry {
            return self.attached_world();
        }
        self.last_world_check.store(now_ms, Ordering::Relaxed);

        let current = self.source.current();
        let mut attached = self.attached.write();
        let unchanged = match (&*attached, &current) {
            (Some(a), Some((id, _))) => a.id == *id,
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            if let Some(old) = attached.take() {
                info!(world = %old.id, "detaching world, saving cached tiles");
                self.cache.purge();
                self.resolver.invalidate();
                self.pipeline.clear();
                self.parked.lock().clear();
                self.tracker.lock().reset();
            }
            *attached = current.map(|(id, world)| {
                info!(world = %id, "world attached");
                AttachedWorld { id, world }
            });
        }
        attached.as_ref().map(|a| Arc::clone(&a.world))
    }

    /// One engine tick: world attachment, debounced change application,
    /// the periodic refresh sweep and cache maintenance.
    pub fn on_tick(&self, now_ms: u64) -> TickReport {
        let mut report = TickReport {
            tick: self.pipeline.advance_tick(),
            ..TickReport::default()
        };

        let Some(world) = self.ensure_world(now_ms) else {
            return report;
        };
        let config = self.config.read().clone();
        if !config.render.worldmap_enabled {
            return report;
        }

        // Taken before the drain so a drain-raised request lands next tick,
        // once its resamples have settled.
        let prune_requested = self.pipeline.take_prune_request();

        let map_hidden = self.follow_player.load(Ordering::Relaxed);
        if map_hidden {
            *self.view_center.lock() = *self.player.lock();
        }
        let (view_x, view_z) = *self.view_center.lock();

        // Debounced changes land on cached tiles. A change inside the
        // resolved window may create its tile; anywhere else an uncached
        // region means nobody is looking, and the change costs nothing.
        let mut pending: Vec<ChunkCoord> = self.parked.lock().drain(..).collect();
        pending.extend(self.pipeline.drain());
        let mut still_parked = Vec::new();
        for chunk in pending {
            // Border light is only valid once all neighbors exist; the
            // chunk parks until a later tick finds them.
            if !chunk_surrounded(world.as_ref(), chunk) {
                if !still_parked.contains(&chunk) {
                    still_parked.push(chunk);
                }
                continue;
            }
            let region = chunk.region();
            let tile = if let Some(tile) = self.cache.peek(region) {
                tile
            } else if self
                .resolver
                .current_window()
                .is_some_and(|w| w.contains(region))
            {
                let (tile, _) = self.cache.get_or_create(region, now_ms);
                self.resolver.patch(region, Arc::clone(&tile));
                tile
            } else {
                continue;
            };
            if tile.is_sentinel() {
                continue;
            }
            tile.mark_chunk_stale(chunk, now_ms);
            // With the map UI open the next render picks the chunk up;
            // hidden, the resample runs now so point queries stay fresh.
            if map_hidden {
                tile.resample(world.as_ref(), &self.materials, now_ms);
            }
            report.changes_applied += 1;
        }
        *self.parked.lock() = still_parked;
        if report.changes_applied > 0 {
            self.pipeline.request_prune();
        }

        // Fallback sweep for hosts that cannot report every change.
        if config.periodic_refresh_ms > 0
            && now_ms.saturating_sub(self.last_refresh.load(Ordering::Relaxed))
                >= config.periodic_refresh_ms
        {
            self.last_refresh.store(now_ms, Ordering::Relaxed);
            #[allow(clippy::cast_possible_truncation)]
            let center = ChunkCoord::from_block(view_x as i32, view_z as i32);
            let mut tracker = self.tracker.lock();
            tracker.recenter(center);
            let fresh = tracker.sweep(|chunk| world.chunk_present(chunk));
            drop(tracker);
            report.refreshed_chunks = fresh.len();
            for chunk in fresh {
                self.pipeline.notify(chunk);
            }
        }

        if prune_requested {
            let prune = self
                .cache
                .prune(view_x, view_z, now_ms, config.compression_idle_ms);
            for region in &prune.collapsed {
                if let Some(sentinel) = self.cache.peek(*region) {
                    self.resolver.patch(*region, sentinel);
                }
            }
            report.prune = Some(prune);
        } else {
            report.compressed = self
                .cache
                .compress_idle(now_ms, config.compression_idle_ms);
        }
        report
    }

    /// Resolves the viewport window of regions. A window change queues a
    /// prune for the next tick; the tiles the old window held on to are
    /// fair game now.
    pub fn resolve_viewport(&self, window: ViewportWindow, now_ms: u64) -> ResolvedView {
        let prior = self.resolver.current_window();
        let view = self.resolver.resolve(window, &self.cache, now_ms);
        if prior != Some(window) {
            self.pipeline.request_prune();
        }
        view
    }

    /// Brings every tile of a resolved view up to date: resamples stale
    /// columns from the world, then recomposites stale pixels.
    pub fn render_view(&self, view: &ResolvedView, now_ms: u64) -> RenderStats {
        let mut stats = RenderStats::default();
        let Some(world) = self.attached_world() else {
            return stats;
        };
        let options = self.config.read().render;
        let curve = self.curve.read();
        let ctx = RenderContext {
            compositor: &self.compositor,
            options: &options,
            curve: &curve,
            path: &self.path,
            grid: &self.grid,
            bottom_y: world.bottom_y(),
            top_y: world.top_y(),
        };
        for tile in view.tiles() {
            stats.chunks_resampled += tile.resample(world.as_ref(), &self.materials, now_ms);
            stats.chunks_rendered += tile.render(&ctx);
        }
        if stats.chunks_resampled > 0 || stats.chunks_rendered > 0 {
            debug!(
                resampled = stats.chunks_resampled,
                rendered = stats.chunks_rendered,
                "view rendered"
            );
        }
        stats
    }

    /// Copies a resolved view's pixels into one contiguous ARGB raster,
    /// row-major, `window.width() * 256` pixels wide. Packed tiles read
    /// as transparent rows.
    #[must_use]
    pub fn rasterize(&self, view: &ResolvedView) -> (usize, usize, Vec<u32>) {
        let window = view.window();
        let width_px = window.width() * 256;
        let height_px = window.height() * 256;
        let mut raster = vec![0u32; width_px * height_px];
        let tiles = view.tiles();
        let mut row = vec![Argb::TRANSPARENT; 256];
        for (slot, tile) in tiles.iter().enumerate() {
            let tile_col = slot % window.width();
            let tile_row = slot / window.width();
            for lz in 0..256 {
                row.fill(Argb::TRANSPARENT);
                let _ = tile.copy_pixel_row(lz, &mut row);
                let out_y = tile_row * 256 + lz;
                let out_x = tile_col * 256;
                let dest = &mut raster[out_y * width_px + out_x..out_y * width_px + out_x + 256];
                for (d, s) in dest.iter_mut().zip(&row) {
                    *d = s.0;
                }
            }
        }
        (width_px, height_px, raster)
    }

    /// Queues a chunk-change notification. Callable from any thread.
    /// Dropped while the worldmap feature is disabled.
    pub fn notify_chunk_changed(&self, chunk: ChunkCoord) {
        if self.config.read().render.worldmap_enabled {
            self.pipeline.notify(chunk);
        }
    }

    /// Requests a prune at the next tick.
    pub fn request_prune(&self) {
        self.pipeline.request_prune();
    }

    /// Updates the player position used by view-follow and proximity
    /// ordering.
    pub fn set_player_position(&self, x: f64, z: f64) {
        *self.player.lock() = (x, z);
    }

    /// Moves the map view explicitly and stops following the player.
    pub fn set_view_center(&self, x: f64, z: f64) {
        self.follow_player.store(false, Ordering::Relaxed);
        *self.view_center.lock() = (x, z);
    }

    /// Shows or hides the map UI. While hidden, the view follows the
    /// player again.
    pub fn set_overlay_visible(&self, visible: bool) {
        self.follow_player.store(!visible, Ordering::Relaxed);
    }

    /// Current view center in block coordinates.
    #[must_use]
    pub fn view_center(&self) -> (f64, f64) {
        *self.view_center.lock()
    }

    /// Replaces the render options; every cached pixel recomposites.
    pub fn set_render_options(&self, options: RenderOptions) {
        self.config.write().render = options;
        self.invalidate_pixels();
    }

    /// Current render options.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        self.config.read().render
    }

    /// Turns the whole worldmap feature on or off.
    pub fn set_worldmap_enabled(&self, enabled: bool) {
        self.config.write().render.worldmap_enabled = enabled;
    }

    /// Installs a new light curve. Pixels recomposite only when the sky
    /// response actually changed (day/night transition), not for block
    /// light flicker.
    pub fn set_light_curve(&self, curve: LightCurve) {
        let changed = self.curve.read().sky_profile_differs(&curve);
        *self.curve.write() = curve;
        if changed {
            debug!("light curve sky profile changed, recompositing");
            self.invalidate_pixels();
        }
    }

    /// Replaces the navigation route shown on the map.
    pub fn set_navigation_path(&self, waypoints: &[(i32, i32)]) {
        for region in self.path.set_path(waypoints) {
            if let Some(tile) = self.cache.peek(region) {
                tile.mark_all_pixels_stale();
            }
        }
    }

    /// Removes the navigation route.
    pub fn clear_navigation_path(&self) {
        for region in self.path.clear() {
            if let Some(tile) = self.cache.peek(region) {
                tile.mark_all_pixels_stale();
            }
        }
    }

    /// Sets the marked-chunk overlay seed.
    pub fn set_marker_seed(&self, seed: Option<u64>) {
        self.grid.set_marker_seed(seed);
        self.invalidate_pixels();
    }

    fn invalidate_pixels(&self) {
        for tile in self.cache.pooled() {
            tile.mark_all_pixels_stale();
        }
    }

    /// True when the region covering the block has completed its initial
    /// store load.
    #[must_use]
    pub fn region_loaded(&self, x: i32, z: i32) -> bool {
        self.cache
            .peek(RegionCoord::from_block(x, z))
            .is_some_and(|tile| tile.is_loaded())
    }

    /// Full sampled column at block coordinates, when its region is
    /// cached.
    #[must_use]
    pub fn column_at(&self, x: i32, z: i32) -> Option<ColumnSample> {
        let tile = self.cache.peek(RegionCoord::from_block(x, z))?;
        let (lx, lz) = local_column(x, z);
        tile.column(lx, lz)
    }

    /// Logs every layer of one column at debug level.
    pub fn log_column(&self, x: i32, z: i32) {
        match self.column_at(x, z) {
            Some(column) => debug!(
                x,
                z,
                surface = ?column.surface,
                transparent = ?column.transparent,
                foliage = ?column.foliage,
                ocean_floor = ?column.ocean_floor,
                biome = ?column.biome,
                "column dump"
            ),
            None => debug!(x, z, "column dump: no cached region"),
        }
    }

    /// Cached surface height at block coordinates.
    #[must_use]
    pub fn height_at(&self, x: i32, z: i32) -> Option<i16> {
        let column = self.column_at(x, z)?;
        (column.surface.height != NO_HEIGHT).then_some(column.surface.height)
    }

    /// Cached biome at block coordinates.
    #[must_use]
    pub fn biome_at(&self, x: i32, z: i32) -> Option<BiomeId> {
        let column = self.column_at(x, z)?;
        (!column.biome.is_sentinel()).then_some(column.biome)
    }

    /// Cached surface material at block coordinates.
    #[must_use]
    pub fn surface_material_at(&self, x: i32, z: i32) -> Option<MaterialId> {
        self.column_at(x, z).map(|c| c.surface.material)
    }

    /// True when the cached surface is standable ground: a recorded
    /// height with a non-air, non-liquid material.
    #[must_use]
    pub fn is_ground_at(&self, x: i32, z: i32) -> bool {
        self.column_at(x, z).is_some_and(|column| {
            let props = self.materials.get(column.surface.material);
            column.surface.height != NO_HEIGHT && !props.is_air() && !props.liquid
        })
    }

    /// Saves every cached tile and drops the cache.
    pub fn purge(&self) {
        self.cache.purge();
        self.resolver.invalidate();
    }

    /// Queues a save of every cached tile and waits for the store to
    /// drain. Call on host shutdown.
    pub fn save_and_flush(&self) {
        self.cache.save_all();
        self.cache.flush_store();
    }

    /// Number of blocks per chunk, re-exported for hosts sizing buffers.
    #[must_use]
    pub const fn chunk_size() -> i32 {
        CHUNK_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercator_world::SyntheticWorld;

    use crate::store::MemoryStore;

    struct TestSource {
        world: RwLock<Option<(String, Arc<dyn BlockWorld + Send + Sync>)>>,
    }

    impl TestSource {
        fn with_world(id: &str, world: Arc<SharedWorld<SyntheticWorld>>) -> Arc<Self> {
            Arc::new(Self {
                world: RwLock::new(Some((id.to_owned(), world as _))),
            })
        }

        fn switch(&self, id: &str, world: Arc<SharedWorld<SyntheticWorld>>) {
            *self.world.write() = Some((id.to_owned(), world as _));
        }
    }

    impl WorldSource for TestSource {
        fn current(&self) -> Option<(String, Arc<dyn BlockWorld + Send + Sync>)> {
            self.world.read().clone()
        }
    }

    fn generated_world(seed: u64) -> Arc<SharedWorld<SyntheticWorld>> {
        let mut world = SyntheticWorld::new(seed);
        world.ensure_region(RegionCoord::new(0, 0));
        Arc::new(SharedWorld::new(world))
    }

    fn quick_config() -> MapConfig {
        let mut config = MapConfig::default();
        config.change_debounce_ticks = 2;
        config.world_retry_ms = 100;
        config.periodic_refresh_ms = 0;
        config
    }

    fn session(source: Arc<TestSource>) -> MapSession {
        MapSession::new(source, Arc::new(MemoryStore::new()), quick_config())
    }

    #[test]
    fn test_attach_resolve_render() {
        let source = TestSource::with_world("overworld", generated_world(11));
        let session = session(source);
        session.on_tick(1_000);
        assert_eq!(session.attached_world_id().as_deref(), Some("overworld"));

        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        let stats = session.render_view(&view, 1_000);
        assert_eq!(stats.chunks_resampled, 256);
        assert_eq!(stats.chunks_rendered, 256);

        let (w, h, raster) = session.rasterize(&view);
        assert_eq!((w, h), (256, 256));
        assert!(raster.iter().any(|p| p >> 24 == 0xFF));

        // Nothing left to do on a second pass.
        let stats = session.render_view(&view, 1_001);
        assert_eq!(stats, RenderStats::default());
    }

    #[test]
    fn test_change_flows_through_debounce() {
        let world = generated_world(11);
        let source = TestSource::with_world("overworld", world.clone());
        let session = session(source);
        // With the map open, applying a change only marks the chunk; the
        // next render does the resample.
        session.set_overlay_visible(true);
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        session.render_view(&view, 1_000);
        let before = session.height_at(40, 40).unwrap();

        let chunk = world.edit(|w| w.set_height(40, 40, 140)).unwrap();
        session.notify_chunk_changed(chunk);

        // One tick is inside the debounce window.
        let report = session.on_tick(1_050);
        assert_eq!(report.changes_applied, 0);
        let report = session.on_tick(1_100);
        assert_eq!(report.changes_applied, 1);

        let stats = session.render_view(&view, 1_100);
        assert_eq!(stats.chunks_resampled, 1);
        assert!(stats.chunks_rendered >= 1);
        let after = session.height_at(40, 40).unwrap();
        assert_ne!(before, after);
        assert_eq!(after, 141);
    }

    #[test]
    fn test_hidden_map_keeps_point_queries_fresh() {
        let world = generated_world(11);
        let source = TestSource::with_world("overworld", world.clone());
        let session = session(source);
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        session.render_view(&view, 1_000);

        // Map closed (the default): applied changes resample right away,
        // so queries answer fresh data without anyone rendering.
        let chunk = world.edit(|w| w.set_height(40, 40, 180)).unwrap();
        session.notify_chunk_changed(chunk);
        session.on_tick(1_050);
        let report = session.on_tick(1_100);
        assert_eq!(report.changes_applied, 1);
        assert_eq!(session.height_at(40, 40), Some(181));
    }

    #[test]
    fn test_unsurrounded_change_parks_until_neighbors_load() {
        let world = generated_world(11);
        let source = TestSource::with_world("overworld", world.clone());
        let session = session(source);
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        session.render_view(&view, 1_000);

        // Chunk (15, 15) sits in the region corner; its east and south
        // neighbors are not generated yet.
        let chunk = world.edit(|w| w.set_height(250, 250, 200)).unwrap();
        assert_eq!(chunk, ChunkCoord::new(15, 15));
        session.notify_chunk_changed(chunk);
        let mut applied = 0;
        for now in [1_100, 1_200, 1_300] {
            applied += session.on_tick(now).changes_applied;
        }
        assert_eq!(applied, 0);

        // The neighbors arrive; the parked change applies on the next
        // tick even with the periodic refresh disabled.
        world.edit(|w| {
            for (dx, dz) in [(1, -1), (1, 0), (1, 1), (0, 1), (-1, 1)] {
                w.ensure_chunk(ChunkCoord::new(15 + dx, 15 + dz));
            }
        });
        let report = session.on_tick(1_400);
        assert_eq!(report.changes_applied, 1);
        assert_eq!(session.height_at(250, 250), Some(201));
    }

    #[test]
    fn test_periodic_refresh_queues_new_chunks() {
        let world = generated_world(11);
        let source = TestSource::with_world("overworld", world.clone());
        let mut config = quick_config();
        config.periodic_refresh_ms = 500;
        config.periodic_refresh_radius = 2;
        let session = MapSession::new(source, Arc::new(MemoryStore::new()), config);

        session.set_player_position(128.0, 128.0);
        let report = session.on_tick(1_000);
        // Chunks well inside the generated region are surrounded.
        assert!(report.refreshed_chunks > 0);
        // Within the refresh interval, no new sweep.
        let report = session.on_tick(1_100);
        assert_eq!(report.refreshed_chunks, 0);
    }

    #[test]
    fn test_world_switch_purges_cache() {
        let source = TestSource::with_world("overworld", generated_world(1));
        let session = session(source.clone());
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        session.render_view(&view, 1_000);
        assert!(!session.cache().is_empty());

        source.switch("cavern", generated_world(2));
        session.on_tick(2_000);
        assert_eq!(session.attached_world_id().as_deref(), Some("cavern"));
        assert!(session.cache().is_empty());
    }

    #[test]
    fn test_point_queries_against_rendered_view() {
        let world = generated_world(11);
        let source = TestSource::with_world("overworld", world.clone());
        let session = session(source);
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        session.render_view(&view, 1_000);

        assert!(session.height_at(100, 100).is_some());
        assert!(session.biome_at(100, 100).is_some());
        assert!(session.surface_material_at(100, 100).is_some());
        // Uncached region: no answer rather than a world read.
        assert!(session.height_at(10_000, 10_000).is_none());
    }

    #[test]
    fn test_prune_request_is_deferred_to_tick() {
        let source = TestSource::with_world("overworld", generated_world(11));
        let session = session(source);
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 1, 0, 0), 1_000);
        session.render_view(&view, 1_000);
        session.cache().flush_store();

        session.request_prune();
        let report = session.on_tick(1_100);
        let prune = report.prune.expect("prune should run on the next tick");
        // Region (1, 0) was never generated: scanned empty, collapsed.
        assert_eq!(prune.collapsed, vec![RegionCoord::new(1, 0)]);
        assert!(session
            .cache()
            .peek(RegionCoord::new(1, 0))
            .unwrap()
            .is_sentinel());
        // The resolved view observes the collapse in place.
        assert!(view.tile(RegionCoord::new(1, 0)).unwrap().is_sentinel());
    }

    #[test]
    fn test_render_option_change_recomposites() {
        let source = TestSource::with_world("overworld", generated_world(11));
        let session = session(source);
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        session.render_view(&view, 1_000);

        let mut options = session.render_options();
        options.heightmap = false;
        session.set_render_options(options);
        let stats = session.render_view(&view, 1_001);
        assert_eq!(stats.chunks_resampled, 0);
        assert_eq!(stats.chunks_rendered, 256);
    }

    #[test]
    fn test_navigation_path_marks_pixels_only() {
        let source = TestSource::with_world("overworld", generated_world(11));
        let session = session(source);
        session.on_tick(1_000);
        let view = session.resolve_viewport(ViewportWindow::new(0, 0, 0, 0), 1_000);
        session.render_view(&view, 1_000);

        session.set_navigation_path(&[(10, 10), (60, 60)]);
        let stats = session.render_view(&view, 1_001);
        assert_eq!(stats.chunks_resampled, 0);
        assert_eq!(stats.chunks_rendered, 256);

        // The path pixels differ from their unpainted neighbors.
        let tile = view.tile(RegionCoord::new(0, 0)).unwrap();
        assert_ne!(tile.pixel(30, 30), tile.pixel(30, 40));
    }
}
