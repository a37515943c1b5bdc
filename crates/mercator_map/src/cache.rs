//! # Region Cache
//!
//! Keyed map of live region tiles plus a flat pool for eviction scans.
//!
//! Lock discipline: the `regions` map lock is always taken BEFORE the
//! `pool` lock. Every path that needs both follows that order; breaking it
//! deadlocks against `get_or_create`.
//!
//! Pruning runs three passes:
//!
//! 1. **dead weight**: fully loaded, fully scanned tiles that found no
//!    terrain collapse to a shared inert sentinel
//! 2. **capacity**: beyond the capacity limit, tiles ranked by last view
//!    (newest first), then by distance to the view center, are evicted;
//!    loaded evictees are packed and handed to the store
//! 3. **compression**: tiles idle past the configured window pack their
//!    payload in place
//!
//! Eviction never blocks on I/O; the store worker owns all backend traffic.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use mercator_core::RegionCoord;

use crate::store::{StoreWorker, TileStore};
use crate::tile::RegionTile;

/// What one prune pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// Empty tiles collapsed to the sentinel, with their replacements.
    pub collapsed: Vec<RegionCoord>,
    /// Tiles evicted over capacity.
    pub evicted: Vec<RegionCoord>,
    /// Tiles packed by the idle-compression pass.
    pub compressed: usize,
}

/// The tile cache.
pub struct RegionCache {
    regions: RwLock<HashMap<i64, Arc<RegionTile>>>,
    pool: Mutex<Vec<Arc<RegionTile>>>,
    capacity: usize,
    worker: StoreWorker,
}

impl RegionCache {
    /// Creates a cache over a persistence backend.
    #[must_use]
    pub fn new(store: Arc<dyn TileStore>, capacity: usize) -> Self {
        Self {
            regions: RwLock::new(HashMap::new()),
            pool: Mutex::new(Vec::new()),
            capacity,
            worker: StoreWorker::spawn(store),
        }
    }

    /// Live tiles currently cached (sentinels included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.read().len()
    }

    /// True when no tile is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.read().is_empty()
    }

    /// Returns the tile for a region, creating (and queueing a store load
    /// for) it on first access. The boolean is true when the tile was
    /// created by this call.
    pub fn get_or_create(&self, region: RegionCoord, now_ms: u64) -> (Arc<RegionTile>, bool) {
        let key = region.packed();
        {
            let regions = self.regions.read();
            if let Some(tile) = regions.get(&key) {
                tile.touch_view(now_ms);
                return (Arc::clone(tile), false);
            }
        }

        let mut regions = self.regions.write();
        if let Some(tile) = regions.get(&key) {
            tile.touch_view(now_ms);
            return (Arc::clone(tile), false);
        }
        let tile = Arc::new(RegionTile::new(region, now_ms));
        regions.insert(key, Arc::clone(&tile));
        // regions before pool, always.
        self.pool.lock().push(Arc::clone(&tile));
        drop(regions);

        self.worker.request_load(Arc::clone(&tile));
        debug!(%region, "region tile created");
        (tile, true)
    }

    /// Returns the cached tile for a region without touching or creating.
    #[must_use]
    pub fn peek(&self, region: RegionCoord) -> Option<Arc<RegionTile>> {
        self.regions.read().get(&region.packed()).cloned()
    }

    /// Snapshot of every pooled (non-sentinel) tile.
    #[must_use]
    pub fn pooled(&self) -> Vec<Arc<RegionTile>> {
        self.pool.lock().clone()
    }

    /// Runs the three prune passes around a view center given in block
    /// coordinates.
    pub fn prune(
        &self,
        view_x: f64,
        view_z: f64,
        now_ms: u64,
        compression_idle_ms: u64,
    ) -> PruneReport {
        let mut report = PruneReport::default();
        let mut regions = self.regions.write();
        let mut pool = self.pool.lock();

        // Pass 1: collapse scanned-empty tiles to the sentinel.
        pool.retain(|tile| {
            let dead = tile.is_loaded() && tile.is_empty() && !tile.has_stale_columns();
            if dead {
                let coord = tile.coord();
                regions.insert(coord.packed(), Arc::new(RegionTile::sentinel(coord)));
                report.collapsed.push(coord);
            }
            !dead
        });

        // Pass 2: evict beyond capacity, keeping recently viewed and
        // nearby tiles.
        if pool.len() > self.capacity {
            pool.sort_by(|a, b| {
                b.most_recent_view()
                    .cmp(&a.most_recent_view())
                    .then_with(|| {
                        a.coord()
                            .distance_sq(view_x, view_z)
                            .partial_cmp(&b.coord().distance_sq(view_x, view_z))
                            .unwrap_or(Ordering::Equal)
                    })
            });
            for tile in pool.drain(self.capacity..) {
                let coord = tile.coord();
                regions.remove(&coord.packed());
                // A tile whose store load never completed may be blank;
                // saving it would clobber real data.
                if tile.is_loaded() {
                    if let Some(bytes) = tile.pack_bytes() {
                        self.worker.save(coord, bytes);
                    }
                }
                report.evicted.push(coord);
            }
        }

        // Pass 3: pack idle payloads in place.
        for tile in pool.iter() {
            if tile.compress_if_idle(now_ms, compression_idle_ms) {
                report.compressed += 1;
            }
        }
        drop(pool);
        drop(regions);

        if !report.collapsed.is_empty() || !report.evicted.is_empty() || report.compressed > 0 {
            info!(
                collapsed = report.collapsed.len(),
                evicted = report.evicted.len(),
                compressed = report.compressed,
                "cache pruned"
            );
        }
        report
    }

    /// Packs idle tiles without evicting. Cheap when nothing is idle.
    pub fn compress_idle(&self, now_ms: u64, compression_idle_ms: u64) -> usize {
        let pool = self.pool.lock();
        pool.iter()
            .filter(|tile| tile.compress_if_idle(now_ms, compression_idle_ms))
            .count()
    }

    /// Queues a save for every loaded tile.
    pub fn save_all(&self) {
        let pool = self.pool.lock();
        for tile in pool.iter() {
            if tile.is_loaded() {
                if let Some(bytes) = tile.pack_bytes() {
                    self.worker.save(tile.coord(), bytes);
                }
            }
        }
    }

    /// Saves everything, then drops every cached tile. Used when switching
    /// worlds.
    pub fn purge(&self) {
        let mut regions = self.regions.write();
        let mut pool = self.pool.lock();
        for tile in pool.drain(..) {
            if tile.is_loaded() {
                if let Some(bytes) = tile.pack_bytes() {
                    self.worker.save(tile.coord(), bytes);
                }
            }
        }
        let dropped = regions.len();
        regions.clear();
        drop(pool);
        drop(regions);
        self.worker.flush();
        info!(dropped, "cache purged");
    }

    /// Blocks until the store worker has drained its queue.
    pub fn flush_store(&self) {
        self.worker.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercator_world::{MaterialRegistry, SyntheticWorld};

    use crate::store::MemoryStore;

    fn cache_with(capacity: usize) -> (RegionCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RegionCache::new(store.clone(), capacity), store)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (cache, _) = cache_with(10);
        let region = RegionCoord::new(0, 0);
        let (first, created) = cache.get_or_create(region, 100);
        assert!(created);
        let (second, created) = cache.get_or_create(region, 200);
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.most_recent_view(), 200);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_create_has_single_winner() {
        let (cache, _) = cache_with(10);
        let cache = Arc::new(cache);
        let region = RegionCoord::new(3, 3);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_or_create(region, i).0)
            })
            .collect();
        let tiles: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(tiles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_dead_weight_collapses_to_sentinel() {
        let (cache, _) = cache_with(10);
        let region = RegionCoord::new(0, 0);
        let (tile, _) = cache.get_or_create(region, 0);
        cache.flush_store();

        // A world with no generated chunks: scanning finds nothing.
        let world = SyntheticWorld::new(1);
        let materials = MaterialRegistry::builtin();
        tile.resample(&world, &materials, 10);
        assert!(tile.is_empty());

        let report = cache.prune(0.0, 0.0, 20, u64::MAX);
        assert_eq!(report.collapsed, vec![region]);
        let swapped = cache.peek(region).unwrap();
        assert!(swapped.is_sentinel());
        assert!(cache.pooled().is_empty());
    }

    #[test]
    fn test_fresh_tiles_are_not_dead_weight() {
        let (cache, _) = cache_with(10);
        cache.get_or_create(RegionCoord::new(0, 0), 0);
        cache.flush_store();
        // Loaded (miss) but never scanned: stale columns protect it.
        let report = cache.prune(0.0, 0.0, 10, u64::MAX);
        assert!(report.collapsed.is_empty());
    }

    #[test]
    fn test_capacity_eviction_prefers_recent_and_near() {
        let (cache, store) = cache_with(2);
        let mut world = SyntheticWorld::new(3);
        let materials = MaterialRegistry::builtin();

        for (i, (x, view_ms)) in [(0, 100), (1, 200), (8, 300)].iter().enumerate() {
            let region = RegionCoord::new(*x, 0);
            let (tile, _) = cache.get_or_create(region, *view_ms);
            // Terrain keeps the tiles out of the dead-weight pass.
            world.ensure_chunk(region.chunk_origin());
            tile.resample(&world, &materials, *view_ms);
            assert!(!tile.is_empty(), "tile {i} should have terrain");
        }
        cache.flush_store();

        let report = cache.prune(128.0, 128.0, 400, u64::MAX);
        // Oldest view loses.
        assert_eq!(report.evicted, vec![RegionCoord::new(0, 0)]);
        assert!(cache.peek(RegionCoord::new(0, 0)).is_none());
        assert!(cache.peek(RegionCoord::new(1, 0)).is_some());
        assert!(cache.peek(RegionCoord::new(8, 0)).is_some());

        // The evictee was persisted.
        cache.flush_store();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_idle_compression_packs_tiles() {
        let (cache, _) = cache_with(10);
        let mut world = SyntheticWorld::new(3);
        let materials = MaterialRegistry::builtin();
        let region = RegionCoord::new(0, 0);
        let (tile, _) = cache.get_or_create(region, 0);
        world.ensure_region(region);
        tile.resample(&world, &materials, 0);
        cache.flush_store();

        assert_eq!(cache.compress_idle(100, 5000), 0);
        assert!(tile.is_live());
        assert_eq!(cache.compress_idle(10_000, 5000), 1);
        assert!(tile.is_packed());
    }

    #[test]
    fn test_purge_saves_and_clears() {
        let (cache, store) = cache_with(10);
        let mut world = SyntheticWorld::new(3);
        let materials = MaterialRegistry::builtin();
        let region = RegionCoord::new(0, 0);
        let (tile, _) = cache.get_or_create(region, 0);
        world.ensure_region(region);
        cache.flush_store();
        tile.resample(&world, &materials, 0);

        cache.purge();
        assert!(cache.is_empty());
        assert_eq!(store.len(), 1);
    }
}
