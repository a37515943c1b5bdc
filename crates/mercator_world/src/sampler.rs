//! # Column Sampling
//!
//! Reduces one world column to the four map layers:
//!
//! - **surface**: the topmost block that occludes skylight
//! - **transparent**: the topmost non-occluding, motion-blocking block above
//!   the surface (glass, fluid sheets)
//! - **foliage**: the block directly above the surface (canopy overlays)
//! - **ocean floor**: the first solid floor beneath a liquid surface
//!
//! The production implementation is [`SurfaceScanner`], a downward walk over
//! the [`BlockWorld`] seam. Heights follow the heightmap convention: a layer
//! at height `h` means its block occupies `h - 1`.

use mercator_core::ChunkCoord;

use crate::biome::BiomeId;
use crate::light::{combined_light, LAVA_LIGHT_FLOOR};
use crate::material::{MaterialId, MaterialRegistry};

/// Height sentinel: "no layer here".
pub const NO_HEIGHT: i16 = i16::MIN;

/// One extracted layer: height, material and stored light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerSample {
    /// One above the layer's block, or [`NO_HEIGHT`].
    pub height: i16,
    /// Material of the layer's block.
    pub material: MaterialId,
    /// Combined light, `block + sky * 16`.
    pub light: u8,
}

impl LayerSample {
    /// The absent layer.
    pub const NONE: Self = Self {
        height: NO_HEIGHT,
        material: MaterialId::AIR,
        light: 0,
    };

    /// True when a height was recorded.
    #[must_use]
    pub const fn has_height(self) -> bool {
        self.height != NO_HEIGHT
    }
}

/// One sampled column: the four layers plus the column's biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSample {
    /// Skylight-occluding surface.
    pub surface: LayerSample,
    /// Transparent layer above (or, under water, within) the column.
    pub transparent: LayerSample,
    /// Canopy block directly above the surface.
    pub foliage: LayerSample,
    /// Solid floor beneath a liquid surface.
    pub ocean_floor: LayerSample,
    /// Biome id, or [`BiomeId::SENTINEL`] when the chunk is absent.
    pub biome: BiomeId,
}

impl ColumnSample {
    /// The "chunk not generated" column. Compositing skips it.
    pub const UNGENERATED: Self = Self {
        surface: LayerSample::NONE,
        transparent: LayerSample::NONE,
        foliage: LayerSample::NONE,
        ocean_floor: LayerSample::NONE,
        biome: BiomeId::SENTINEL,
    };
}

/// The host-world seam: per-block material and light queries.
///
/// Implementations must answer for any coordinate; blocks outside the world
/// or inside absent chunks read as air with zero light.
pub trait BlockWorld {
    /// Lowest buildable Y.
    fn bottom_y(&self) -> i16;
    /// One above the highest buildable Y.
    fn top_y(&self) -> i16;
    /// Material of the block at `(x, y, z)`.
    fn material_at(&self, x: i32, y: i16, z: i32) -> MaterialId;
    /// Block-light channel at `(x, y, z)`, `0..=15`.
    fn block_light(&self, x: i32, y: i16, z: i32) -> u8;
    /// Sky-light channel at `(x, y, z)`, `0..=15`.
    fn sky_light(&self, x: i32, y: i16, z: i32) -> u8;
    /// Y of the highest motion-blocking or fluid block of the column, or
    /// `bottom_y() - 1` for an all-air column.
    fn motion_blocking_height(&self, x: i32, z: i32) -> i16;
    /// Biome of the column, or the sentinel when the chunk is absent.
    fn biome_at(&self, x: i32, z: i32) -> BiomeId;
    /// Whether the chunk is present (generated and loaded).
    fn chunk_present(&self, chunk: ChunkCoord) -> bool;
    /// Whether the world has a solid roof (caverns, nether-like). Roofed
    /// worlds use the gap-probe scan instead of the skylight scan.
    fn roofed(&self) -> bool {
        false
    }
}

/// Samples one column of the world. Pure with respect to world state: the
/// same world produces the same sample.
pub trait ColumnSampler {
    /// Extracts the column at block coordinates `(x, z)`.
    fn sample(&self, x: i32, z: i32) -> ColumnSample;
}

/// Cavern probe start height.
const CAVERN_PROBE_Y: i16 = 80;
/// Cavern probe ceiling when searching upward for a gap.
const CAVERN_CEILING_Y: i16 = 90;

/// The production [`ColumnSampler`]: a surface scan over a [`BlockWorld`].
pub struct SurfaceScanner<'a> {
    world: &'a dyn BlockWorld,
    materials: &'a MaterialRegistry,
}

impl<'a> SurfaceScanner<'a> {
    /// Creates a scanner over the given world.
    #[must_use]
    pub fn new(world: &'a dyn BlockWorld, materials: &'a MaterialRegistry) -> Self {
        Self { world, materials }
    }

    fn material(&self, x: i32, y: i16, z: i32) -> MaterialId {
        self.world.material_at(x, y, z)
    }

    fn is_opaque(&self, id: MaterialId) -> bool {
        self.materials.get(id).is_opaque()
    }

    /// Stored light for one layer. Solid columns read 0; air reads 255 (no
    /// attenuation); lava and magma carry the block-light floor.
    fn layer_light(&self, id: MaterialId, x: i32, z: i32, height: i16, solid: bool) -> u8 {
        if solid {
            return 0;
        }
        if self.materials.is_air(id) {
            return 255;
        }
        let y = height.clamp(self.world.bottom_y(), self.world.top_y());
        let mut block = self.world.block_light(x, y, z) & 15;
        if self.materials.is_glowing_hot(id) {
            block = LAVA_LIGHT_FLOOR;
        }
        combined_light(block, self.world.sky_light(x, y, z))
    }

    /// Skylight scan: walk down from the motion-blocking heightmap until a
    /// block occludes light, collecting transparent and foliage candidates
    /// on the way, then the ocean-floor walk if the surface is liquid.
    fn scan_open_sky(&self, x: i32, z: i32) -> (LayerSample, LayerSample, LayerSample, LayerSample) {
        let bottom = self.world.bottom_y();

        let transparent_height = self.world.motion_blocking_height(x, z) + 1;
        let transparent_material = self.material(x, transparent_height - 1, z);

        let mut surface_height = transparent_height;
        let mut surface_material = transparent_material;
        let mut foliage_material = MaterialId::AIR;

        while !self.is_opaque(surface_material) && surface_height > bottom {
            foliage_material = surface_material;
            surface_height -= 1;
            surface_material = self.material(x, surface_height - 1, z);
        }

        let mut transparent = LayerSample::NONE;
        if surface_height == transparent_height {
            // Nothing transparent sat above the surface; the foliage
            // candidate is the block directly above it instead.
            foliage_material = self.material(x, surface_height, z);
        } else {
            transparent = LayerSample {
                height: transparent_height,
                material: transparent_material,
                light: 0,
            };
        }

        // A snow layer above the surface becomes the surface itself.
        if foliage_material == MaterialId::SNOW {
            surface_material = MaterialId::SNOW;
            foliage_material = MaterialId::AIR;
        }
        if transparent.has_height() && foliage_material == transparent.material {
            foliage_material = MaterialId::AIR;
        }

        let mut foliage = LayerSample::NONE;
        if !self.materials.is_air(foliage_material) {
            foliage = LayerSample {
                height: surface_height + 1,
                material: foliage_material,
                light: 0,
            };
        }

        let mut ocean_floor = LayerSample::NONE;
        if surface_material == MaterialId::WATER || surface_material == MaterialId::ICE {
            let (floor, transparent_fill, foliage_fill) =
                self.scan_ocean_floor(x, z, surface_height, transparent, foliage);
            ocean_floor = floor;
            transparent = transparent_fill;
            foliage = foliage_fill;
        }

        let surface = LayerSample {
            height: surface_height,
            material: surface_material,
            light: 0,
        };
        (surface, transparent, foliage, ocean_floor)
    }

    /// Walks down through a liquid column toward the floor, filling in the
    /// transparent and foliage layers from whatever sits in the liquid when
    /// the skylight scan left them empty.
    fn scan_ocean_floor(
        &self,
        x: i32,
        z: i32,
        surface_height: i16,
        mut transparent: LayerSample,
        mut foliage: LayerSample,
    ) -> (LayerSample, LayerSample, LayerSample) {
        let bottom = self.world.bottom_y();
        let mut floor_height = surface_height;
        let mut floor_material = self.material(x, floor_height - 1, z);

        loop {
            let props = self.materials.get(floor_material);
            if props.light_block >= 5
                || floor_material == MaterialId::LEAVES
                || floor_height <= bottom + 1
            {
                break;
            }

            let is_liquid_or_ice =
                floor_material == MaterialId::WATER || floor_material == MaterialId::ICE;
            if !transparent.has_height() && !is_liquid_or_ice && props.blocks_motion {
                transparent = LayerSample {
                    height: floor_height,
                    material: floor_material,
                    light: 0,
                };
            }
            if !foliage.has_height()
                && floor_height != transparent.height
                && transparent.material != floor_material
                && !is_liquid_or_ice
                && !props.is_air()
                && !props.liquid
            {
                foliage = LayerSample {
                    height: floor_height,
                    material: floor_material,
                    light: 0,
                };
            }

            floor_height -= 1;
            floor_material = self.material(x, floor_height - 1, z);
        }

        // A walk that bottomed out in water has no floor; the height is
        // kept so the compositor still takes the water-transparency path.
        if floor_material == MaterialId::WATER {
            floor_material = MaterialId::AIR;
        }
        let floor = LayerSample {
            height: floor_height,
            material: floor_material,
            light: 0,
        };
        (floor, transparent, foliage)
    }

    /// Roofed-world scan: probe at a fixed height for an air gap and take
    /// the first lit-from-below surface. Lava never counts as a gap.
    fn scan_cavern(&self, x: i32, z: i32) -> (LayerSample, LayerSample) {
        let bottom = self.world.bottom_y();
        let mut y = CAVERN_PROBE_Y;
        let probe = self.material(x, y, z);

        let surface_height = if !self.is_opaque(probe) && probe != MaterialId::LAVA {
            // Inside a gap: descend to the first occluding or lava block.
            let mut found = NO_HEIGHT;
            while y > bottom {
                y -= 1;
                let m = self.material(x, y, z);
                if self.is_opaque(m) || m == MaterialId::LAVA {
                    found = y + 1;
                    break;
                }
            }
            if found == NO_HEIGHT {
                y
            } else {
                found
            }
        } else {
            // Inside rock: ascend looking for the first gap.
            let mut found = NO_HEIGHT;
            while y <= CAVERN_CEILING_Y {
                y += 1;
                let m = self.material(x, y, z);
                if !self.is_opaque(m) && m != MaterialId::LAVA {
                    found = y;
                    break;
                }
            }
            found
        };

        // No gap anywhere in the probe range: the column is solid rock.
        let surface_material = if surface_height == NO_HEIGHT {
            MaterialId::AIR
        } else {
            self.material(x, surface_height - 1, z)
        };
        let surface = LayerSample {
            height: surface_height,
            material: surface_material,
            light: 0,
        };

        let mut foliage = LayerSample::NONE;
        if surface_height != NO_HEIGHT {
            let above = self.material(x, surface_height, z);
            let skip = self.materials.is_air(above)
                || above == MaterialId::SNOW
                || above == MaterialId::LAVA
                || above == MaterialId::WATER;
            if !skip {
                foliage = LayerSample {
                    height: surface_height + 1,
                    material: above,
                    light: 0,
                };
            }
        }
        (surface, foliage)
    }
}

impl ColumnSampler for SurfaceScanner<'_> {
    fn sample(&self, x: i32, z: i32) -> ColumnSample {
        if !self.world.chunk_present(ChunkCoord::from_block(x, z)) {
            return ColumnSample::UNGENERATED;
        }
        let biome = self.world.biome_at(x, z);
        if biome.is_sentinel() {
            return ColumnSample::UNGENERATED;
        }

        let bottom = self.world.bottom_y();
        let (mut surface, mut transparent, mut foliage, mut ocean_floor) = if self.world.roofed() {
            let (surface, foliage) = self.scan_cavern(x, z);
            (surface, LayerSample::NONE, foliage, LayerSample::NONE)
        } else {
            self.scan_open_sky(x, z)
        };

        // A column with no recorded surface is "solid" and stores zero
        // light, except that a lava surface is never solid.
        let mut light_height = surface.height;
        let mut solid = false;
        if surface.height < bottom {
            light_height = CAVERN_PROBE_Y;
            solid = true;
        }
        if surface.material == MaterialId::LAVA {
            solid = false;
        }

        surface.light = self.layer_light(surface.material, x, z, light_height, solid);
        if !self.materials.is_air(transparent.material) {
            transparent.light =
                self.layer_light(transparent.material, x, z, transparent.height, solid);
        }
        if !self.materials.is_air(foliage.material) {
            foliage.light = self.layer_light(foliage.material, x, z, foliage.height, solid);
        }
        if !self.materials.is_air(ocean_floor.material) {
            ocean_floor.light =
                self.layer_light(ocean_floor.material, x, z, ocean_floor.height, solid);
        }

        ColumnSample {
            surface,
            transparent,
            foliage,
            ocean_floor,
            biome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Hand-authored world: a map from `(x, y, z)` to material, flat light.
    struct FixtureWorld {
        blocks: HashMap<(i32, i16, i32), MaterialId>,
        biome: BiomeId,
        present: bool,
        roofed: bool,
        materials: MaterialRegistry,
    }

    impl FixtureWorld {
        fn new() -> Self {
            Self {
                blocks: HashMap::new(),
                biome: BiomeId::PLAINS,
                present: true,
                roofed: false,
                materials: MaterialRegistry::builtin(),
            }
        }

        fn set(&mut self, x: i32, y: i16, z: i32, m: MaterialId) {
            self.blocks.insert((x, y, z), m);
        }

        /// Fills a column from bottom up to `top` inclusive.
        fn fill(&mut self, x: i32, z: i32, top: i16, m: MaterialId) {
            for y in 0..=top {
                self.set(x, y, z, m);
            }
        }
    }

    impl BlockWorld for FixtureWorld {
        fn bottom_y(&self) -> i16 {
            0
        }
        fn top_y(&self) -> i16 {
            256
        }
        fn material_at(&self, x: i32, y: i16, z: i32) -> MaterialId {
            self.blocks.get(&(x, y, z)).copied().unwrap_or_default()
        }
        fn block_light(&self, _x: i32, _y: i16, _z: i32) -> u8 {
            2
        }
        fn sky_light(&self, _x: i32, _y: i16, _z: i32) -> u8 {
            15
        }
        fn motion_blocking_height(&self, x: i32, z: i32) -> i16 {
            let mut best = self.bottom_y() - 1;
            for (&(bx, y, bz), &m) in &self.blocks {
                let props = self.materials.get(m);
                if bx == x && bz == z && (props.blocks_motion || props.liquid) && y > best {
                    best = y;
                }
            }
            best
        }
        fn biome_at(&self, _x: i32, _z: i32) -> BiomeId {
            self.biome
        }
        fn chunk_present(&self, _chunk: ChunkCoord) -> bool {
            self.present
        }
        fn roofed(&self) -> bool {
            self.roofed
        }
    }

    fn scan(world: &FixtureWorld, x: i32, z: i32) -> ColumnSample {
        SurfaceScanner::new(world, &world.materials).sample(x, z)
    }

    #[test]
    fn test_plain_ground_column() {
        let mut w = FixtureWorld::new();
        w.fill(0, 0, 63, MaterialId::STONE);
        w.set(0, 63, 0, MaterialId::GRASS);
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.height, 64);
        assert_eq!(sample.surface.material, MaterialId::GRASS);
        assert_eq!(sample.surface.light, combined_light(2, 15));
        assert!(!sample.transparent.has_height());
        assert!(!sample.foliage.has_height());
        assert!(!sample.ocean_floor.has_height());
        assert_eq!(sample.biome, BiomeId::PLAINS);
    }

    #[test]
    fn test_foliage_directly_above_surface() {
        let mut w = FixtureWorld::new();
        w.fill(0, 0, 63, MaterialId::DIRT);
        w.set(0, 64, 0, MaterialId::TALL_GRASS);
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.height, 64);
        assert_eq!(sample.foliage.height, 65);
        assert_eq!(sample.foliage.material, MaterialId::TALL_GRASS);
    }

    #[test]
    fn test_glass_becomes_transparent_layer() {
        let mut w = FixtureWorld::new();
        w.fill(0, 0, 63, MaterialId::STONE);
        w.set(0, 70, 0, MaterialId::GLASS);
        let sample = scan(&w, 0, 0);
        // Glass blocks motion but not light, so the scan starts at it and
        // descends to the stone beneath.
        assert_eq!(sample.surface.height, 64);
        assert_eq!(sample.surface.material, MaterialId::STONE);
        assert_eq!(sample.transparent.height, 71);
        assert_eq!(sample.transparent.material, MaterialId::GLASS);
    }

    #[test]
    fn test_snow_layer_promotes_to_surface() {
        let mut w = FixtureWorld::new();
        w.fill(0, 0, 63, MaterialId::STONE);
        w.set(0, 64, 0, MaterialId::SNOW);
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.height, 64);
        assert_eq!(sample.surface.material, MaterialId::SNOW);
        assert!(!sample.foliage.has_height());
    }

    #[test]
    fn test_water_column_produces_all_four_layers() {
        let mut w = FixtureWorld::new();
        w.fill(0, 0, 50, MaterialId::STONE);
        w.set(0, 51, 0, MaterialId::SAND);
        for y in 52..=63 {
            w.set(0, y, 0, MaterialId::WATER);
        }
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.height, 64);
        assert_eq!(sample.surface.material, MaterialId::WATER);
        assert_eq!(sample.ocean_floor.height, 52);
        assert_eq!(sample.ocean_floor.material, MaterialId::SAND);
    }

    #[test]
    fn test_bottomless_water_clears_floor_material() {
        let mut w = FixtureWorld::new();
        for y in 0..=63 {
            w.set(0, y, 0, MaterialId::WATER);
        }
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.material, MaterialId::WATER);
        // The walk hit bottom still in water: a floor height is kept but
        // the material is cleared.
        assert!(sample.ocean_floor.has_height());
        assert_eq!(sample.ocean_floor.material, MaterialId::AIR);
    }

    #[test]
    fn test_lava_surface_is_never_dark() {
        let mut w = FixtureWorld::new();
        w.fill(0, 0, 40, MaterialId::STONE);
        for y in 41..=63 {
            w.set(0, y, 0, MaterialId::LAVA);
        }
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.material, MaterialId::LAVA);
        // Block light is forced to the lava floor regardless of the world's
        // reported light.
        assert_eq!(sample.surface.light, combined_light(LAVA_LIGHT_FLOOR, 15));
        assert_ne!(sample.surface.light, 0);
    }

    #[test]
    fn test_absent_chunk_yields_sentinel() {
        let mut w = FixtureWorld::new();
        w.present = false;
        assert_eq!(scan(&w, 0, 0), ColumnSample::UNGENERATED);
    }

    #[test]
    fn test_sampling_is_idempotent() {
        let mut w = FixtureWorld::new();
        w.fill(3, 7, 62, MaterialId::DIRT);
        w.set(3, 63, 7, MaterialId::GRASS);
        w.set(3, 64, 7, MaterialId::LEAVES);
        assert_eq!(scan(&w, 3, 7), scan(&w, 3, 7));
    }

    #[test]
    fn test_cavern_probe_finds_floor_below_gap() {
        let mut w = FixtureWorld::new();
        w.roofed = true;
        w.fill(0, 0, 60, MaterialId::STONE);
        // Probe height 80 is open air; the first occluder below is at 60.
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.height, 61);
        assert_eq!(sample.surface.material, MaterialId::STONE);
    }

    #[test]
    fn test_cavern_probe_ascends_out_of_rock() {
        let mut w = FixtureWorld::new();
        w.roofed = true;
        w.fill(0, 0, 85, MaterialId::STONE);
        // Probe height 80 is inside rock; the first gap above is at 86.
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.height, 86);
    }

    #[test]
    fn test_cavern_with_no_gap_is_solid() {
        let mut w = FixtureWorld::new();
        w.roofed = true;
        w.fill(0, 0, 120, MaterialId::STONE);
        let sample = scan(&w, 0, 0);
        assert_eq!(sample.surface.height, NO_HEIGHT);
        assert_eq!(sample.surface.material, MaterialId::AIR);
        assert_eq!(sample.surface.light, 0);
        assert!(!sample.foliage.has_height());
    }

    #[test]
    fn test_cavern_lava_floor_is_not_a_gap() {
        let mut w = FixtureWorld::new();
        w.roofed = true;
        w.fill(0, 0, 30, MaterialId::STONE);
        for y in 31..=40 {
            w.set(0, y, 0, MaterialId::LAVA);
        }
        let sample = scan(&w, 0, 0);
        // Descent stops at the lava, not at the stone beneath it.
        assert_eq!(sample.surface.height, 41);
        assert_eq!(sample.surface.material, MaterialId::LAVA);
        assert_ne!(sample.surface.light, 0);
    }
}
