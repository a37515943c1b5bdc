//! # Biome Registry
//!
//! Biome tints and map colors.
//!
//! A column with no biome (chunk not yet generated) carries
//! [`BiomeId::SENTINEL`] and is skipped by the compositor entirely.

use mercator_core::Argb;

use crate::material::TintKind;

/// Identifier of one biome in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BiomeId(pub u16);

impl BiomeId {
    /// "No biome here": the chunk was not generated when sampled.
    pub const SENTINEL: Self = Self(u16::MAX);

    /// Plains.
    pub const PLAINS: Self = Self(0);
    /// Forest.
    pub const FOREST: Self = Self(1);
    /// Desert.
    pub const DESERT: Self = Self(2);
    /// Ocean.
    pub const OCEAN: Self = Self(3);
    /// Swamp.
    pub const SWAMP: Self = Self(4);
    /// Tundra.
    pub const TUNDRA: Self = Self(5);
    /// Jungle.
    pub const JUNGLE: Self = Self(6);
    /// Mountains.
    pub const MOUNTAINS: Self = Self(7);

    /// True for the "no biome" sentinel.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == u16::MAX
    }
}

/// Properties of one biome.
#[derive(Clone, Copy, Debug)]
pub struct Biome {
    /// Display name for logs.
    pub name: &'static str,
    /// Opaque color used by the biome overlay modes.
    pub map_color: Argb,
    /// Multiplier for [`TintKind::Grass`] materials.
    pub grass_tint: Argb,
    /// Multiplier for [`TintKind::Foliage`] materials.
    pub foliage_tint: Argb,
    /// Multiplier for [`TintKind::Water`] materials.
    pub water_tint: Argb,
}

/// Lookup table from [`BiomeId`] to [`Biome`].
pub struct BiomeRegistry {
    biomes: Vec<Biome>,
}

impl BiomeRegistry {
    /// Builds the registry with the builtin biome set.
    #[must_use]
    pub fn builtin() -> Self {
        let b = |name, map_color, grass, foliage, water| Biome {
            name,
            map_color: Argb(map_color),
            grass_tint: Argb(grass),
            foliage_tint: Argb(foliage),
            water_tint: Argb(water),
        };
        Self {
            biomes: vec![
                b("plains", 0xFF8D_B360, 0xFF91_BD59, 0xFF77_AB2F, 0xFF3F_76E4),
                b("forest", 0xFF05_6621, 0xFF79_C05A, 0xFF59_AE30, 0xFF3F_76E4),
                b("desert", 0xFFFA_9418, 0xFFBF_B755, 0xFFAE_A42A, 0xFF32_A598),
                b("ocean", 0xFF00_0070, 0xFF8E_B971, 0xFF71_A74D, 0xFF17_87D4),
                b("swamp", 0xFF07_F9B2, 0xFF6A_7039, 0xFF6A_7039, 0xFF61_7B64),
                b("tundra", 0xFFFF_FFFF, 0xFF80_B497, 0xFF60_A17B, 0xFF3D_57D6),
                b("jungle", 0xFF53_7B09, 0xFF59_C93C, 0xFF30_BB0B, 0xFF14_A2C5),
                b("mountains", 0xFF60_6060, 0xFF8A_B689, 0xFF6D_A36B, 0xFF00_7BF7),
            ],
        }
    }

    /// Resolves a biome; the sentinel and unknown ids resolve to `None`.
    #[must_use]
    pub fn get(&self, id: BiomeId) -> Option<&Biome> {
        if id.is_sentinel() {
            return None;
        }
        self.biomes.get(usize::from(id.0))
    }

    /// Opaque map color for the biome overlay; black for unknown biomes.
    #[must_use]
    pub fn map_color(&self, id: BiomeId) -> Argb {
        self.get(id).map_or(Argb::BLACK, |b| b.map_color)
    }

    /// Tint multiplier for a material's tint channel in the given biome,
    /// or `None` when the material is untinted or the biome is unknown.
    #[must_use]
    pub fn tint_for(&self, id: BiomeId, kind: TintKind) -> Option<Argb> {
        let biome = self.get(id)?;
        match kind {
            TintKind::None => None,
            TintKind::Grass => Some(biome.grass_tint),
            TintKind::Foliage => Some(biome.foliage_tint),
            TintKind::Water => Some(biome.water_tint),
        }
    }

    /// Biome-independent default tint, used when biome coloring is
    /// disabled. The plains palette.
    #[must_use]
    pub fn default_tint(&self, kind: TintKind) -> Option<Argb> {
        self.tint_for(BiomeId::PLAINS, kind)
    }

    /// Display name for logs; the sentinel reads as `"none"`.
    #[must_use]
    pub fn name(&self, id: BiomeId) -> &'static str {
        self.get(id).map_or("none", |b| b.name)
    }
}
