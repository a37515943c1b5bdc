//! # Chunk Tracker
//!
//! The periodic-refresh fallback needs to know which chunks near the view
//! became fully available since the last sweep. A chunk only samples
//! cleanly once it and all eight neighbors are present (lighting and
//! heightmaps at chunk edges depend on neighbors), so the tracker reports
//! chunks on their loaded-to-surrounded transition.
//!
//! The window recenters with the view, carrying overlapping state along.
//! Chunks that slide out of the window are forgotten; if they slide back
//! in they report again, which at worst costs one redundant resample.

use mercator_core::ChunkCoord;

/// Tracks surrounded-state transitions in a square chunk window.
pub struct ChunkTracker {
    radius: i32,
    center: ChunkCoord,
    /// Chunks already reported as surrounded, window-relative row-major.
    reported: Vec<bool>,
}

impl ChunkTracker {
    /// Default window radius in chunks.
    pub const DEFAULT_RADIUS: i32 = 16;

    /// Creates a tracker centered at the origin.
    #[must_use]
    pub fn new(radius: i32) -> Self {
        let side = (2 * radius + 1) as usize;
        Self {
            radius,
            center: ChunkCoord::new(0, 0),
            reported: vec![false; side * side],
        }
    }

    fn side(&self) -> i32 {
        2 * self.radius + 1
    }

    fn index(&self, chunk: ChunkCoord) -> Option<usize> {
        let dx = chunk.x - self.center.x + self.radius;
        let dz = chunk.z - self.center.z + self.radius;
        if dx < 0 || dz < 0 || dx >= self.side() || dz >= self.side() {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        Some((dz * self.side() + dx) as usize)
    }

    /// Current window center.
    #[must_use]
    pub fn center(&self) -> ChunkCoord {
        self.center
    }

    /// Moves the window, preserving state for chunks covered by both the
    /// old and new windows.
    pub fn recenter(&mut self, center: ChunkCoord) {
        if center == self.center {
            return;
        }
        let side = self.side();
        let mut shifted = vec![false; (side * side) as usize];
        for dz in 0..side {
            for dx in 0..side {
                let chunk = ChunkCoord::new(
                    center.x + dx - self.radius,
                    center.z + dz - self.radius,
                );
                if let Some(old_index) = self.index(chunk) {
                    #[allow(clippy::cast_sign_loss)]
                    let new_index = (dz * side + dx) as usize;
                    shifted[new_index] = self.reported[old_index];
                }
            }
        }
        self.center = center;
        self.reported = shifted;
    }

    /// Forgets all reported state.
    pub fn reset(&mut self) {
        self.reported.fill(false);
    }

    /// Sweeps the window against a presence predicate and returns chunks
    /// that are newly surrounded. Chunks that lost presence are unmarked
    /// and will report again when they return.
    pub fn sweep(&mut self, is_present: impl Fn(ChunkCoord) -> bool) -> Vec<ChunkCoord> {
        let side = self.side();
        // Presence over the window plus a one-chunk apron for the
        // neighbor checks at the rim.
        let apron = side + 2;
        let mut present = vec![false; (apron * apron) as usize];
        for dz in 0..apron {
            for dx in 0..apron {
                let chunk = ChunkCoord::new(
                    self.center.x + dx - self.radius - 1,
                    self.center.z + dz - self.radius - 1,
                );
                #[allow(clippy::cast_sign_loss)]
                {
                    present[(dz * apron + dx) as usize] = is_present(chunk);
                }
            }
        }
        #[allow(clippy::cast_sign_loss)]
        let at = |dx: i32, dz: i32| present[((dz + 1) * apron + dx + 1) as usize];

        let mut fresh = Vec::new();
        for dz in 0..side {
            for dx in 0..side {
                #[allow(clippy::cast_sign_loss)]
                let index = (dz * side + dx) as usize;
                let surrounded = at(dx, dz)
                    && at(dx - 1, dz - 1)
                    && at(dx, dz - 1)
                    && at(dx + 1, dz - 1)
                    && at(dx - 1, dz)
                    && at(dx + 1, dz)
                    && at(dx - 1, dz + 1)
                    && at(dx, dz + 1)
                    && at(dx + 1, dz + 1);
                if surrounded && !self.reported[index] {
                    self.reported[index] = true;
                    fresh.push(ChunkCoord::new(
                        self.center.x + dx - self.radius,
                        self.center.z + dz - self.radius,
                    ));
                } else if !surrounded && self.reported[index] {
                    self.reported[index] = false;
                }
            }
        }
        fresh
    }
}
