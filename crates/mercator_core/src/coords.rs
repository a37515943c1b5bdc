//! # Map-Space Coordinates
//!
//! Three nested grids address the map:
//!
//! - **block**: one world column, the sampling unit
//! - **chunk**: 16x16 blocks, the change-notification unit
//! - **region**: 256x256 blocks (16x16 chunks), the caching unit
//!
//! Region coordinates double as cache keys in two interchangeable forms: a
//! display string `"x,z"` and a packed `i64`. Both round-trip exactly.

use std::fmt;

use crate::error::CoreError;

/// Blocks per region side.
pub const REGION_SIZE: i32 = 256;
/// Blocks per chunk side.
pub const CHUNK_SIZE: i32 = 16;
/// Chunks per region side.
pub const CHUNKS_PER_REGION: i32 = 16;

/// Coordinate of one 256x256-block region tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoord {
    /// Region x (block x divided by 256, floored).
    pub x: i32,
    /// Region z (block z divided by 256, floored).
    pub z: i32,
}

impl RegionCoord {
    /// Creates a region coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing the given block column.
    #[must_use]
    pub fn from_block(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(REGION_SIZE),
            z: block_z.div_euclid(REGION_SIZE),
        }
    }

    /// Region containing the given chunk.
    #[must_use]
    pub fn from_chunk(chunk: ChunkCoord) -> Self {
        Self {
            x: chunk.x.div_euclid(CHUNKS_PER_REGION),
            z: chunk.z.div_euclid(CHUNKS_PER_REGION),
        }
    }

    /// Packs both axes into one `i64` key.
    #[must_use]
    pub const fn packed(self) -> i64 {
        ((self.x as u32 as i64) << 32) | (self.z as u32 as i64)
    }

    /// Inverse of [`Self::packed`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_packed(key: i64) -> Self {
        Self {
            x: (key >> 32) as i32,
            z: key as i32,
        }
    }

    /// Parses the `"x,z"` key form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegionKey`] when the string is not two
    /// comma-separated integers.
    pub fn parse(key: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidRegionKey(key.to_owned());
        let (x, z) = key.split_once(',').ok_or_else(invalid)?;
        Ok(Self {
            x: x.trim().parse().map_err(|_| invalid())?,
            z: z.trim().parse().map_err(|_| invalid())?,
        })
    }

    /// Block coordinate of the region's north-west corner.
    #[must_use]
    pub const fn block_origin(self) -> (i32, i32) {
        (self.x * REGION_SIZE, self.z * REGION_SIZE)
    }

    /// Block coordinate of the region's center.
    #[must_use]
    pub const fn center_block(self) -> (i32, i32) {
        (
            self.x * REGION_SIZE + REGION_SIZE / 2,
            self.z * REGION_SIZE + REGION_SIZE / 2,
        )
    }

    /// Squared block-space distance from the region's center to a point.
    ///
    /// The eviction and creation orderings both rank regions by this value.
    #[must_use]
    pub fn distance_sq(self, block_x: f64, block_z: f64) -> f64 {
        let (cx, cz) = self.center_block();
        let dx = f64::from(cx) - block_x;
        let dz = f64::from(cz) - block_z;
        dx * dx + dz * dz
    }

    /// First chunk of the region.
    #[must_use]
    pub const fn chunk_origin(self) -> ChunkCoord {
        ChunkCoord {
            x: self.x * CHUNKS_PER_REGION,
            z: self.z * CHUNKS_PER_REGION,
        }
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

/// Coordinate of one 16x16-block chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// Chunk x (block x divided by 16, floored).
    pub x: i32,
    /// Chunk z (block z divided by 16, floored).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the given block column.
    #[must_use]
    pub fn from_block(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_SIZE),
            z: block_z.div_euclid(CHUNK_SIZE),
        }
    }

    /// Region that owns this chunk.
    #[must_use]
    pub fn region(self) -> RegionCoord {
        RegionCoord::from_chunk(self)
    }

    /// Chunk position inside its region, each axis in `0..16`.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn local_in_region(self) -> (usize, usize) {
        (
            self.x.rem_euclid(CHUNKS_PER_REGION) as usize,
            self.z.rem_euclid(CHUNKS_PER_REGION) as usize,
        )
    }

    /// Block coordinate of the chunk's north-west corner.
    #[must_use]
    pub const fn block_origin(self) -> (i32, i32) {
        (self.x * CHUNK_SIZE, self.z * CHUNK_SIZE)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Row-major index of a local column in a region raster.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn column_index(local_x: usize, local_z: usize) -> usize {
    local_z * REGION_SIZE as usize + local_x
}

/// Column position inside its region, each axis in `0..256`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn local_column(block_x: i32, block_z: i32) -> (usize, usize) {
    (
        block_x.rem_euclid(REGION_SIZE) as usize,
        block_z.rem_euclid(REGION_SIZE) as usize,
    )
}
