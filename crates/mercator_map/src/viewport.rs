//! # Viewport Resolution
//!
//! Maps a rectangular window of regions to tile references. The resolver
//! keeps exactly one resolved window; re-requesting the same window is a
//! clone with no cache traffic, and any other window is a full recompute.
//!
//! A recompute first flushes the store worker, so saves queued by a prior
//! eviction are visible to the loads the new window triggers. Missing
//! tiles are created nearest-to-center first, which makes the area around
//! the view usable earliest.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use mercator_core::RegionCoord;

use crate::cache::RegionCache;
use crate::tile::RegionTile;

/// Inclusive rectangle of region coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportWindow {
    /// Westmost region x.
    pub left: i32,
    /// Eastmost region x.
    pub right: i32,
    /// Northmost region z.
    pub top: i32,
    /// Southmost region z.
    pub bottom: i32,
}

impl ViewportWindow {
    /// Creates a window. Inverted bounds (`left > right` or `top > bottom`)
    /// make an empty window that resolves to zero slots; callers use
    /// `new(0, -1, 0, -1)` to release a live view.
    #[must_use]
    pub fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Window of regions covering a square of blocks around a center.
    #[must_use]
    pub fn around_block(center_x: i32, center_z: i32, radius_blocks: i32) -> Self {
        let min = RegionCoord::from_block(center_x - radius_blocks, center_z - radius_blocks);
        let max = RegionCoord::from_block(center_x + radius_blocks, center_z + radius_blocks);
        Self::new(min.x, max.x, min.z, max.z)
    }

    /// Regions per row, zero for an inverted window.
    #[must_use]
    pub fn width(&self) -> usize {
        if self.right < self.left {
            0
        } else {
            (self.right - self.left + 1).unsigned_abs() as usize
        }
    }

    /// Regions per column, zero for an inverted window.
    #[must_use]
    pub fn height(&self) -> usize {
        if self.bottom < self.top {
            0
        } else {
            (self.bottom - self.top + 1).unsigned_abs() as usize
        }
    }

    /// Total regions in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    /// True for a window that covers no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the window contains the region.
    #[must_use]
    pub fn contains(&self, region: RegionCoord) -> bool {
        region.x >= self.left
            && region.x <= self.right
            && region.z >= self.top
            && region.z <= self.bottom
    }

    /// Row-major slot index of a region inside the window.
    #[must_use]
    pub fn index_of(&self, region: RegionCoord) -> Option<usize> {
        if !self.contains(region) {
            return None;
        }
        let col = (region.x - self.left).unsigned_abs() as usize;
        let row = (region.z - self.top).unsigned_abs() as usize;
        Some(row * self.width() + col)
    }

    /// Iterates the window's regions in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = RegionCoord> + '_ {
        let (left, top) = (self.left, self.top);
        let width = self.width();
        (0..self.len()).map(move |i| {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            RegionCoord::new(left + (i % width) as i32, top + (i / width) as i32)
        })
    }

    /// Block-space center of the window.
    #[must_use]
    pub fn center_block(&self) -> (f64, f64) {
        (
            f64::from(self.left + self.right + 1) * 128.0,
            f64::from(self.top + self.bottom + 1) * 128.0,
        )
    }
}

/// One resolved window: a slot of tiles per region, row-major.
#[derive(Clone)]
pub struct ResolvedView {
    window: ViewportWindow,
    slots: Arc<[RwLock<Arc<RegionTile>>]>,
}

impl ResolvedView {
    /// The window this view resolves.
    #[must_use]
    pub fn window(&self) -> ViewportWindow {
        self.window
    }

    /// Tile at a slot index.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<Arc<RegionTile>> {
        self.slots.get(index).map(|slot| Arc::clone(&slot.read()))
    }

    /// Tile for a region inside the window.
    #[must_use]
    pub fn tile(&self, region: RegionCoord) -> Option<Arc<RegionTile>> {
        self.slot(self.window.index_of(region)?)
    }

    /// Snapshot of every tile, row-major.
    #[must_use]
    pub fn tiles(&self) -> Vec<Arc<RegionTile>> {
        self.slots
            .iter()
            .map(|slot| Arc::clone(&slot.read()))
            .collect()
    }
}

/// Size-one window cache over the region cache.
#[derive(Default)]
pub struct ViewportResolver {
    last: RwLock<Option<ResolvedView>>,
}

impl ViewportResolver {
    /// Empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a window. The previously resolved window is returned
    /// as-is; anything else flushes the store and rebuilds, creating
    /// missing tiles nearest to the window center first.
    pub fn resolve(
        &self,
        window: ViewportWindow,
        cache: &RegionCache,
        now_ms: u64,
    ) -> ResolvedView {
        {
            let last = self.last.read();
            if let Some(view) = last.as_ref() {
                if view.window == window {
                    return view.clone();
                }
            }
        }

        // Pending saves must land before the loads this resolve queues.
        cache.flush_store();

        let (center_x, center_z) = window.center_block();
        let mut order: Vec<RegionCoord> = window.iter().collect();
        order.sort_by(|a, b| {
            a.distance_sq(center_x, center_z)
                .partial_cmp(&b.distance_sq(center_x, center_z))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut slots: Vec<Option<Arc<RegionTile>>> = vec![None; window.len()];
        let mut created = 0;
        for region in order {
            let (tile, was_created) = cache.get_or_create(region, now_ms);
            if was_created {
                created += 1;
            }
            if let Some(index) = window.index_of(region) {
                slots[index] = Some(tile);
            }
        }
        debug!(
            left = window.left,
            right = window.right,
            top = window.top,
            bottom = window.bottom,
            created,
            "viewport resolved"
        );

        let slots: Arc<[RwLock<Arc<RegionTile>>]> = slots
            .into_iter()
            .flatten()
            .map(RwLock::new)
            .collect();
        let view = ResolvedView { window, slots };
        *self.last.write() = Some(view.clone());
        view
    }

    /// Replaces the slot for one region in the resolved window, if the
    /// window covers it. Used when a cached tile is swapped out from under
    /// the view (sentinel collapse).
    pub fn patch(&self, region: RegionCoord, tile: Arc<RegionTile>) {
        let last = self.last.read();
        if let Some(view) = last.as_ref() {
            if let Some(index) = view.window.index_of(region) {
                if let Some(slot) = view.slots.get(index) {
                    *slot.write() = tile;
                }
            }
        }
    }

    /// Drops the resolved window so the next resolve recomputes.
    pub fn invalidate(&self) {
        *self.last.write() = None;
    }

    /// The currently resolved window, if any.
    #[must_use]
    pub fn current_window(&self) -> Option<ViewportWindow> {
        self.last.read().as_ref().map(|view| view.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cache() -> RegionCache {
        RegionCache::new(Arc::new(MemoryStore::new()), 64)
    }

    #[test]
    fn test_window_geometry() {
        let window = ViewportWindow::new(-1, 1, 0, 2);
        assert_eq!(window.width(), 3);
        assert_eq!(window.height(), 3);
        assert_eq!(window.len(), 9);
        assert!(window.contains(RegionCoord::new(0, 1)));
        assert!(!window.contains(RegionCoord::new(2, 1)));
        assert_eq!(window.index_of(RegionCoord::new(-1, 0)), Some(0));
        assert_eq!(window.index_of(RegionCoord::new(1, 2)), Some(8));
        assert_eq!(window.iter().count(), 9);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let window = ViewportWindow::new(0, -1, 0, -1);
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        assert_eq!(window.width(), 0);
        assert_eq!(window.iter().count(), 0);
        assert!(!window.contains(RegionCoord::new(0, 0)));

        // Resolving it yields no slots and creates no tiles.
        let cache = cache();
        let resolver = ViewportResolver::new();
        let view = resolver.resolve(window, &cache, 0);
        assert!(view.tiles().is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_window_around_block() {
        let window = ViewportWindow::around_block(128, 128, 300);
        assert!(window.contains(RegionCoord::new(0, 0)));
        assert!(window.contains(RegionCoord::new(1, 1)));
        assert!(window.contains(RegionCoord::new(-1, -1)));
    }

    #[test]
    fn test_same_window_is_cached() {
        let cache = cache();
        let resolver = ViewportResolver::new();
        let window = ViewportWindow::new(0, 1, 0, 1);
        let first = resolver.resolve(window, &cache, 100);
        let created = cache.len();
        let second = resolver.resolve(window, &cache, 999);
        assert_eq!(cache.len(), created);
        // No touch either: the tiles still carry the first timestamp.
        let tile = second.tile(RegionCoord::new(0, 0)).unwrap();
        assert_eq!(tile.most_recent_view(), 100);
        assert_eq!(first.window(), second.window());
    }

    #[test]
    fn test_new_window_recomputes_and_touches() {
        let cache = cache();
        let resolver = ViewportResolver::new();
        resolver.resolve(ViewportWindow::new(0, 0, 0, 0), &cache, 100);
        let view = resolver.resolve(ViewportWindow::new(0, 1, 0, 0), &cache, 200);
        assert_eq!(view.tiles().len(), 2);
        let tile = view.tile(RegionCoord::new(0, 0)).unwrap();
        assert_eq!(tile.most_recent_view(), 200);
    }

    #[test]
    fn test_every_slot_is_filled() {
        let cache = cache();
        let resolver = ViewportResolver::new();
        let window = ViewportWindow::new(-2, 2, -1, 1);
        let view = resolver.resolve(window, &cache, 0);
        assert_eq!(view.tiles().len(), window.len());
        for region in window.iter() {
            let tile = view.tile(region).unwrap();
            assert_eq!(tile.coord(), region);
        }
    }

    #[test]
    fn test_patch_replaces_slot_in_place() {
        let cache = cache();
        let resolver = ViewportResolver::new();
        let window = ViewportWindow::new(0, 1, 0, 0);
        let view = resolver.resolve(window, &cache, 0);

        let region = RegionCoord::new(1, 0);
        let sentinel = Arc::new(RegionTile::sentinel(region));
        resolver.patch(region, Arc::clone(&sentinel));
        // The already-resolved view observes the swap.
        assert!(view.tile(region).unwrap().is_sentinel());
        // Out-of-window patches are ignored.
        resolver.patch(RegionCoord::new(9, 9), sentinel);
    }
}
