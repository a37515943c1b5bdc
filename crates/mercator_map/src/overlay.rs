//! # Map Overlays
//!
//! Two overlays paint over composited terrain:
//!
//! - [`PathOverlay`]: the active navigation route, rasterized to a block
//!   set so the per-pixel check is a hash lookup
//! - [`GridOverlay`]: chunk boundary lines plus an optional marked-chunk
//!   tint driven by a world seed
//!
//! Overlays are blended at composite time, so changing one invalidates
//! pixels, never sampled columns.

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::debug;

use mercator_core::{Argb, RegionCoord, CHUNK_SIZE};

/// Color blended over path pixels.
const PATH_COLOR: Argb = Argb(0xA0FF_3C14);
/// Half-width of the painted path in blocks.
const PATH_RADIUS: i32 = 1;
/// Shade factor applied on chunk boundaries.
const GRID_SHADE: f64 = -0.2;
/// Tint blended over marked chunks.
const MARKER_TINT: Argb = Argb(0x5A3C_FF50);

#[derive(Default)]
struct PathState {
    blocks: HashSet<(i32, i32)>,
    regions: HashSet<RegionCoord>,
}

/// The navigation route overlay.
#[derive(Default)]
pub struct PathOverlay {
    state: RwLock<PathState>,
}

impl PathOverlay {
    /// Empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the route with a polyline of block waypoints. Returns every
    /// region whose pixels the change touches, old route included.
    pub fn set_path(&self, waypoints: &[(i32, i32)]) -> Vec<RegionCoord> {
        let mut blocks = HashSet::new();
        for pair in waypoints.windows(2) {
            rasterize_segment(&mut blocks, pair[0], pair[1]);
        }
        if let [only] = waypoints {
            stamp(&mut blocks, only.0, only.1);
        }
        let regions: HashSet<RegionCoord> = blocks
            .iter()
            .map(|&(x, z)| RegionCoord::from_block(x, z))
            .collect();

        let mut state = self.state.write();
        let mut touched: Vec<RegionCoord> =
            state.regions.union(&regions).copied().collect();
        touched.sort_unstable();
        debug!(
            waypoints = waypoints.len(),
            blocks = blocks.len(),
            regions = regions.len(),
            "navigation path updated"
        );
        state.blocks = blocks;
        state.regions = regions;
        touched
    }

    /// Removes the route. Returns the regions it covered.
    pub fn clear(&self) -> Vec<RegionCoord> {
        let mut state = self.state.write();
        let mut touched: Vec<RegionCoord> = state.regions.drain().collect();
        touched.sort_unstable();
        state.blocks.clear();
        touched
    }

    /// True when no route is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().blocks.is_empty()
    }

    /// True when the route covers the given block.
    #[must_use]
    pub fn covers(&self, x: i32, z: i32) -> bool {
        self.state.read().blocks.contains(&(x, z))
    }

    /// Blends the path color over a pixel on the route; off-route pixels
    /// pass through.
    #[must_use]
    pub fn blend(&self, color: Argb, x: i32, z: i32) -> Argb {
        if self.state.read().blocks.contains(&(x, z)) {
            color.blend_over(PATH_COLOR)
        } else {
            color
        }
    }
}

fn stamp(blocks: &mut HashSet<(i32, i32)>, x: i32, z: i32) {
    for dz in -PATH_RADIUS..=PATH_RADIUS {
        for dx in -PATH_RADIUS..=PATH_RADIUS {
            blocks.insert((x + dx, z + dz));
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn rasterize_segment(blocks: &mut HashSet<(i32, i32)>, from: (i32, i32), to: (i32, i32)) {
    let (dx, dz) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dz.abs());
    if steps == 0 {
        stamp(blocks, from.0, from.1);
        return;
    }
    for i in 0..=steps {
        let x = from.0 + (i64::from(dx) * i64::from(i) / i64::from(steps)) as i32;
        let z = from.1 + (i64::from(dz) * i64::from(i) / i64::from(steps)) as i32;
        stamp(blocks, x, z);
    }
}

/// The chunk grid and marked-chunk overlay.
#[derive(Default)]
pub struct GridOverlay {
    marker_seed: RwLock<Option<u64>>,
}

impl GridOverlay {
    /// Overlay with no marked chunks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears the seed the marked-chunk predicate derives from.
    pub fn set_marker_seed(&self, seed: Option<u64>) {
        *self.marker_seed.write() = seed;
    }

    /// Whether the chunk containing a block is marked under the current
    /// seed.
    #[must_use]
    pub fn is_marked(&self, x: i32, z: i32) -> bool {
        let Some(seed) = *self.marker_seed.read() else {
            return false;
        };
        let cx = x.div_euclid(CHUNK_SIZE);
        let cz = z.div_euclid(CHUNK_SIZE);
        chunk_hash(seed, cx, cz) % 10 == 0
    }

    /// Applies boundary shading and the marked-chunk tint to one pixel.
    #[must_use]
    pub fn apply(&self, color: Argb, x: i32, z: i32) -> Argb {
        let mut color = color;
        if self.is_marked(x, z) {
            color = color.blend_over(MARKER_TINT);
        }
        if x.rem_euclid(CHUNK_SIZE) == 0 || z.rem_euclid(CHUNK_SIZE) == 0 {
            color = color.shade(GRID_SHADE);
        }
        color
    }
}

/// Seed-stable chunk hash (splitmix64 over the packed coordinates).
#[allow(clippy::cast_sign_loss)]
fn chunk_hash(seed: u64, cx: i32, cz: i32) -> u64 {
    let mut state = seed
        .wrapping_add((cx as u64) << 32 | (cz as u64 & 0xFFFF_FFFF))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    state = (state ^ (state >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    state = (state ^ (state >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    state ^ (state >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_covers_segment_and_width() {
        let overlay = PathOverlay::new();
        overlay.set_path(&[(0, 0), (10, 0)]);
        assert!(overlay.covers(0, 0));
        assert!(overlay.covers(5, 0));
        assert!(overlay.covers(10, 0));
        // One block of half-width on each side.
        assert!(overlay.covers(5, 1));
        assert!(overlay.covers(5, -1));
        assert!(!overlay.covers(5, 3));
    }

    #[test]
    fn test_path_reports_touched_regions() {
        let overlay = PathOverlay::new();
        let touched = overlay.set_path(&[(250, 0), (260, 0)]);
        assert_eq!(
            touched,
            vec![RegionCoord::new(0, 0), RegionCoord::new(1, 0)]
        );
        // Replacing the route reports both the old and new footprint.
        let touched = overlay.set_path(&[(600, 600), (610, 600)]);
        assert!(touched.contains(&RegionCoord::new(0, 0)));
        assert!(touched.contains(&RegionCoord::new(1, 0)));
        assert!(touched.contains(&RegionCoord::new(2, 2)));
    }

    #[test]
    fn test_clear_path() {
        let overlay = PathOverlay::new();
        overlay.set_path(&[(0, 0), (4, 4)]);
        assert!(!overlay.is_empty());
        let touched = overlay.clear();
        assert_eq!(touched, vec![RegionCoord::new(0, 0)]);
        assert!(overlay.is_empty());
        assert!(!overlay.covers(0, 0));
    }

    #[test]
    fn test_blend_only_on_route() {
        let overlay = PathOverlay::new();
        overlay.set_path(&[(0, 0), (0, 0)]);
        let base = Argb::opaque(10, 10, 10);
        assert_ne!(overlay.blend(base, 0, 0), base);
        assert_eq!(overlay.blend(base, 50, 50), base);
    }

    #[test]
    fn test_grid_shades_boundaries_only() {
        let overlay = GridOverlay::new();
        let base = Argb::opaque(100, 100, 100);
        assert_eq!(overlay.apply(base, 3, 5), base);
        assert_eq!(overlay.apply(base, 16, 5), Argb::opaque(80, 80, 80));
        assert_eq!(overlay.apply(base, 3, -16), Argb::opaque(80, 80, 80));
    }

    #[test]
    fn test_marker_is_seed_stable_and_sparse() {
        let overlay = GridOverlay::new();
        assert!(!overlay.is_marked(0, 0));
        overlay.set_marker_seed(Some(42));
        let marked: Vec<bool> = (0..100)
            .map(|i| overlay.is_marked(i * 16, 0))
            .collect();
        let count = marked.iter().filter(|m| **m).count();
        assert!(count > 0 && count < 50, "marked {count} of 100");
        // Same seed, same answer.
        let again: Vec<bool> = (0..100)
            .map(|i| overlay.is_marked(i * 16, 0))
            .collect();
        assert_eq!(marked, again);
        overlay.set_marker_seed(None);
        assert!(!overlay.is_marked(0, 0));
    }
}
