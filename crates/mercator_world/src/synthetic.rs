//! # Synthetic World
//!
//! A deterministic [`BlockWorld`] used by tests, benches and the demo
//! binary. Terrain comes from seeded value noise, so the same seed yields
//! the same world on every platform. Chunks must be generated explicitly
//! with [`SyntheticWorld::ensure_chunk`]; ungenerated chunks read as absent,
//! which is what exercises the sentinel paths downstream.

use std::collections::HashMap;

use mercator_core::{ChunkCoord, RegionCoord, CHUNKS_PER_REGION, CHUNK_SIZE};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::biome::BiomeId;
use crate::material::MaterialId;
use crate::sampler::BlockWorld;

/// Water fills every generated column up to this Y.
pub const SEA_LEVEL: i16 = 62;

const BOTTOM_Y: i16 = 0;
const TOP_Y: i16 = 320;
/// Noise lattice cell size in blocks.
const CELL: i32 = 32;
const TRUNK_HEIGHT: i16 = 4;

#[derive(Clone, Copy)]
struct Column {
    /// Y of the topmost solid terrain block.
    height: i16,
    biome: BiomeId,
    tree: bool,
}

/// Seeded, chunk-granular world model.
pub struct SyntheticWorld {
    seed: u64,
    chunks: HashMap<ChunkCoord, Vec<Column>>,
    roofed: bool,
}

impl SyntheticWorld {
    /// Creates an empty world with the given seed. No chunks exist until
    /// [`Self::ensure_chunk`] generates them.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            chunks: HashMap::new(),
            roofed: false,
        }
    }

    /// Switches the world to the roofed (cavern) scan mode.
    pub fn set_roofed(&mut self, roofed: bool) {
        self.roofed = roofed;
    }

    /// Lattice noise value in `0.0..1.0` for one cell corner.
    fn lattice(&self, channel: u64, cell_x: i32, cell_z: i32) -> f64 {
        let mix = self
            .seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(channel.wrapping_mul(0xD1B5_4A32_D192_ED03))
            .wrapping_add((cell_x as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F))
            .wrapping_add((cell_z as u64).wrapping_mul(0x1656_67B1_9E37_79F9));
        ChaCha8Rng::seed_from_u64(mix).gen_range(0.0..1.0)
    }

    /// Bilinear value noise in `0.0..1.0` at a block position.
    fn noise(&self, channel: u64, x: i32, z: i32) -> f64 {
        let cell_x = x.div_euclid(CELL);
        let cell_z = z.div_euclid(CELL);
        let fx = f64::from(x.rem_euclid(CELL)) / f64::from(CELL);
        let fz = f64::from(z.rem_euclid(CELL)) / f64::from(CELL);
        let c00 = self.lattice(channel, cell_x, cell_z);
        let c10 = self.lattice(channel, cell_x + 1, cell_z);
        let c01 = self.lattice(channel, cell_x, cell_z + 1);
        let c11 = self.lattice(channel, cell_x + 1, cell_z + 1);
        let top = c00 + (c10 - c00) * fx;
        let bottom = c01 + (c11 - c01) * fx;
        top + (bottom - top) * fz
    }

    #[allow(clippy::cast_possible_truncation)]
    fn generate_column(&self, x: i32, z: i32) -> Column {
        let broad = self.noise(0, x, z);
        let detail = self.noise(1, x * 4, z * 4);
        let height = 48.0 + broad * 40.0 + detail * 6.0;
        let height = (height as i16).clamp(BOTTOM_Y + 4, TOP_Y - 16);

        let moisture = self.noise(2, x, z);
        let biome = if height < SEA_LEVEL - 2 {
            BiomeId::OCEAN
        } else if height > 84 {
            BiomeId::MOUNTAINS
        } else if moisture > 0.7 {
            BiomeId::FOREST
        } else if moisture < 0.25 {
            BiomeId::DESERT
        } else {
            BiomeId::PLAINS
        };

        let tree = biome == BiomeId::FOREST
            && height > SEA_LEVEL
            && self.noise(3, x * 16, z * 16) > 0.8;
        Column {
            height,
            biome,
            tree,
        }
    }

    /// Generates the chunk if it does not exist yet.
    pub fn ensure_chunk(&mut self, chunk: ChunkCoord) {
        if self.chunks.contains_key(&chunk) {
            return;
        }
        let (ox, oz) = chunk.block_origin();
        let mut columns = Vec::with_capacity((CHUNK_SIZE * CHUNK_SIZE) as usize);
        for dz in 0..CHUNK_SIZE {
            for dx in 0..CHUNK_SIZE {
                columns.push(self.generate_column(ox + dx, oz + dz));
            }
        }
        self.chunks.insert(chunk, columns);
    }

    /// Generates every chunk of a region.
    pub fn ensure_region(&mut self, region: RegionCoord) {
        let origin = region.chunk_origin();
        for dz in 0..CHUNKS_PER_REGION {
            for dx in 0..CHUNKS_PER_REGION {
                self.ensure_chunk(ChunkCoord::new(origin.x + dx, origin.z + dz));
            }
        }
    }

    fn column(&self, x: i32, z: i32) -> Option<&Column> {
        let chunk = ChunkCoord::from_block(x, z);
        let columns = self.chunks.get(&chunk)?;
        let lx = x.rem_euclid(CHUNK_SIZE);
        let lz = z.rem_euclid(CHUNK_SIZE);
        columns.get((lz * CHUNK_SIZE + lx) as usize)
    }

    fn column_mut(&mut self, x: i32, z: i32) -> Option<&mut Column> {
        let chunk = ChunkCoord::from_block(x, z);
        let columns = self.chunks.get_mut(&chunk)?;
        let lx = x.rem_euclid(CHUNK_SIZE);
        let lz = z.rem_euclid(CHUNK_SIZE);
        columns.get_mut((lz * CHUNK_SIZE + lx) as usize)
    }

    /// Rewrites one column's terrain height. Returns the chunk that changed,
    /// or `None` when the chunk was never generated. Drives the change
    /// pipeline in tests.
    pub fn set_height(&mut self, x: i32, z: i32, height: i16) -> Option<ChunkCoord> {
        let column = self.column_mut(x, z)?;
        column.height = height.clamp(BOTTOM_Y + 1, TOP_Y - 1);
        column.tree = false;
        Some(ChunkCoord::from_block(x, z))
    }

    /// Terrain height of a generated column.
    #[must_use]
    pub fn height_at(&self, x: i32, z: i32) -> Option<i16> {
        self.column(x, z).map(|c| c.height)
    }

    fn surface_material(column: &Column) -> MaterialId {
        match column.biome {
            BiomeId::DESERT => MaterialId::SAND,
            BiomeId::OCEAN => MaterialId::GRAVEL,
            BiomeId::MOUNTAINS => MaterialId::STONE,
            _ => MaterialId::GRASS,
        }
    }
}

impl BlockWorld for SyntheticWorld {
    fn bottom_y(&self) -> i16 {
        BOTTOM_Y
    }

    fn top_y(&self) -> i16 {
        TOP_Y
    }

    fn material_at(&self, x: i32, y: i16, z: i32) -> MaterialId {
        let Some(column) = self.column(x, z) else {
            return MaterialId::AIR;
        };
        if y < BOTTOM_Y || y >= TOP_Y {
            return MaterialId::AIR;
        }
        if y == BOTTOM_Y {
            return MaterialId::BEDROCK;
        }
        if y <= column.height {
            if y == column.height {
                return Self::surface_material(column);
            }
            if y >= column.height - 3 {
                return MaterialId::DIRT;
            }
            return MaterialId::STONE;
        }
        if column.tree {
            let above = y - column.height;
            if above <= TRUNK_HEIGHT {
                return MaterialId::WOOD;
            }
            if above <= TRUNK_HEIGHT + 2 {
                return MaterialId::LEAVES;
            }
        }
        if y <= SEA_LEVEL {
            return MaterialId::WATER;
        }
        MaterialId::AIR
    }

    fn block_light(&self, _x: i32, _y: i16, _z: i32) -> u8 {
        0
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sky_light(&self, x: i32, y: i16, z: i32) -> u8 {
        let Some(column) = self.column(x, z) else {
            return 0;
        };
        // Full daylight above the water line, one level lost per block of
        // water depth below it.
        let exposed = column.height.max(SEA_LEVEL);
        if y >= exposed {
            15
        } else {
            (15 - i32::from(exposed - y).min(15)) as u8
        }
    }

    fn motion_blocking_height(&self, x: i32, z: i32) -> i16 {
        let Some(column) = self.column(x, z) else {
            return BOTTOM_Y - 1;
        };
        let mut top = column.height.max(SEA_LEVEL.min(TOP_Y - 1));
        if column.height < SEA_LEVEL {
            top = SEA_LEVEL;
        }
        if column.tree {
            top = top.max(column.height + TRUNK_HEIGHT + 2);
        }
        top
    }

    fn biome_at(&self, x: i32, z: i32) -> BiomeId {
        self.column(x, z).map_or(BiomeId::SENTINEL, |c| c.biome)
    }

    fn chunk_present(&self, chunk: ChunkCoord) -> bool {
        self.chunks.contains_key(&chunk)
    }

    fn roofed(&self) -> bool {
        self.roofed
    }
}
