//! # Material Registry
//!
//! Block properties the scanner and compositor consume.
//!
//! The map never looks at real block state. Every block the host world
//! reports is reduced to a [`MaterialId`], and everything the engine needs
//! to know about it (occlusion, motion blocking, fluid-ness, base color,
//! tint channel) lives in the [`MaterialRegistry`] record for that id.

use mercator_core::Argb;

/// Identifier of one material in the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// Air / nothing.
    pub const AIR: Self = Self(0);
    /// Stone.
    pub const STONE: Self = Self(1);
    /// Dirt.
    pub const DIRT: Self = Self(2);
    /// Grass block (biome-tinted).
    pub const GRASS: Self = Self(3);
    /// Sand.
    pub const SAND: Self = Self(4);
    /// Gravel.
    pub const GRAVEL: Self = Self(5);
    /// Still or flowing water (fluid states are normalized to this).
    pub const WATER: Self = Self(6);
    /// Ice sheet.
    pub const ICE: Self = Self(7);
    /// Snow layer.
    pub const SNOW: Self = Self(8);
    /// Still or flowing lava (fluid states are normalized to this).
    pub const LAVA: Self = Self(9);
    /// Magma block.
    pub const MAGMA: Self = Self(10);
    /// Leaves (biome-tinted canopy).
    pub const LEAVES: Self = Self(11);
    /// Glass (transparent, motion-blocking).
    pub const GLASS: Self = Self(12);
    /// Wood / log.
    pub const WOOD: Self = Self(13);
    /// Tall grass (non-blocking foliage).
    pub const TALL_GRASS: Self = Self(14);
    /// Bedrock.
    pub const BEDROCK: Self = Self(15);
}

/// Which biome tint channel a material's base color is multiplied by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TintKind {
    /// No biome tinting.
    #[default]
    None,
    /// Grass tint channel.
    Grass,
    /// Foliage tint channel (leaves, vines).
    Foliage,
    /// Water tint channel.
    Water,
}

/// Properties of one material.
#[derive(Clone, Copy, Debug)]
pub struct Material {
    /// Display name for logs.
    pub name: &'static str,
    /// Untinted ARGB base color; alpha below `0xFF` makes the layer
    /// translucent in the compositor's additive-over blend.
    pub base_color: Argb,
    /// How much light the block removes when passing through (0..=15).
    pub light_block: u8,
    /// Whether the block's shape occludes skylight even at `light_block` 0.
    pub occludes: bool,
    /// Whether the block shows up in the motion-blocking heightmap.
    pub blocks_motion: bool,
    /// Whether the block is a fluid.
    pub liquid: bool,
    /// Biome tint channel.
    pub tint: TintKind,
}

impl Material {
    /// True for the air material.
    #[must_use]
    pub fn is_air(&self) -> bool {
        self.base_color.is_transparent() && !self.blocks_motion && self.light_block == 0
    }

    /// True when the block stops the surface scan: it either removes light
    /// or its shape occludes skylight.
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.light_block > 0 || self.occludes
    }
}

/// Lookup table from [`MaterialId`] to [`Material`].
///
/// Unknown ids resolve to air, so a registry mismatch degrades to a blank
/// pixel instead of a panic.
pub struct MaterialRegistry {
    materials: Vec<Material>,
}

impl MaterialRegistry {
    /// Builds the registry with the builtin material set.
    #[must_use]
    pub fn builtin() -> Self {
        let m = |name, color, light_block, occludes, blocks_motion, liquid, tint| Material {
            name,
            base_color: Argb(color),
            light_block,
            occludes,
            blocks_motion,
            liquid,
            tint,
        };
        Self {
            materials: vec![
                m("air", 0x0000_0000, 0, false, false, false, TintKind::None),
                m("stone", 0xFF7D_7D7D, 15, true, true, false, TintKind::None),
                m("dirt", 0xFF86_6043, 15, true, true, false, TintKind::None),
                m("grass", 0xFF9C_9C9C, 15, true, true, false, TintKind::Grass),
                m("sand", 0xFFDB_D3A0, 15, true, true, false, TintKind::None),
                m("gravel", 0xFF83_7B7B, 15, true, true, false, TintKind::None),
                m("water", 0x9F31_43D4, 1, false, false, true, TintKind::Water),
                m("ice", 0xBF7D_ADFF, 1, false, true, false, TintKind::None),
                m("snow", 0xFFF0_FBFB, 0, false, false, false, TintKind::None),
                m("lava", 0xFFD4_5A12, 1, false, false, true, TintKind::None),
                m("magma", 0xFF8E_3F20, 15, true, true, false, TintKind::None),
                m("leaves", 0xBF8C_8C8C, 1, false, true, false, TintKind::Foliage),
                m("glass", 0x50FF_FFFF, 0, false, true, false, TintKind::None),
                m("wood", 0xFF6B_5433, 15, true, true, false, TintKind::None),
                m("tall_grass", 0x708E_8E8E, 0, false, false, false, TintKind::Grass),
                m("bedrock", 0xFF33_3333, 15, true, true, false, TintKind::None),
            ],
        }
    }

    /// Resolves a material id; unknown ids resolve to air.
    #[must_use]
    pub fn get(&self, id: MaterialId) -> &Material {
        self.materials
            .get(usize::from(id.0))
            .unwrap_or(&self.materials[0])
    }

    /// Shorthand for `get(id).is_air()`.
    #[must_use]
    pub fn is_air(&self, id: MaterialId) -> bool {
        self.get(id).is_air()
    }

    /// True for glass-kind materials; the slope shader lets these borrow
    /// the neighbor's surface height when the neighbor has no transparent
    /// layer of its own.
    #[must_use]
    pub fn is_glass(&self, id: MaterialId) -> bool {
        id == MaterialId::GLASS
    }

    /// True for materials forced to the minimum block-light floor.
    #[must_use]
    pub fn is_glowing_hot(&self, id: MaterialId) -> bool {
        id == MaterialId::LAVA || id == MaterialId::MAGMA
    }

    /// Number of registered materials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// True when the registry has no materials. Never the case for
    /// [`Self::builtin`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
