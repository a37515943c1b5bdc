//! # Engine Configuration
//!
//! One TOML file holds every tunable of the map engine. Missing file means
//! defaults; missing keys mean their individual defaults; `save` always
//! writes the complete table.

use std::fs;
use std::path::Path;

use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// How the biome overlay is painted over terrain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BiomeOverlay {
    /// No biome overlay.
    #[default]
    Off,
    /// Replace the pixel with the opaque biome map color.
    Replace,
    /// Blend the biome map color at half alpha over composited terrain.
    Wash,
}

impl BiomeOverlay {
    /// Numeric form used by the config file: 0, 1 or 2.
    #[must_use]
    pub const fn mode(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Replace => 1,
            Self::Wash => 2,
        }
    }

    /// Inverse of [`Self::mode`]. Unknown values fall back to `Off`.
    #[must_use]
    pub const fn from_mode(mode: u8) -> Self {
        match mode {
            1 => Self::Replace,
            2 => Self::Wash,
            _ => Self::Off,
        }
    }
}

impl Serialize for BiomeOverlay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.mode())
    }
}

impl<'de> Deserialize<'de> for BiomeOverlay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mode = u8::deserialize(deserializer)?;
        if mode > 2 {
            return Err(D::Error::custom(format!(
                "biome_overlay must be 0, 1 or 2, got {mode}"
            )));
        }
        Ok(Self::from_mode(mode))
    }
}

/// Render-time toggles consumed by the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Biome overlay mode.
    pub biome_overlay: BiomeOverlay,
    /// Logarithmic brightness shading by height above/below sea level.
    pub heightmap: bool,
    /// Diagonal-neighbor slope shading.
    pub slopemap: bool,
    /// Light-curve attenuation by stored block/sky light.
    pub lightmap: bool,
    /// Render the ocean floor beneath translucent water.
    pub water_transparency: bool,
    /// Render transparent and foliage layers above the surface.
    pub block_transparency: bool,
    /// Tint materials by biome; off uses the default tint per material.
    pub biomes: bool,
    /// Darken pixels on chunk boundaries.
    pub chunk_grid: bool,
    /// Master switch for the whole worldmap feature.
    pub worldmap_enabled: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            biome_overlay: BiomeOverlay::Off,
            heightmap: true,
            slopemap: true,
            lightmap: true,
            water_transparency: true,
            block_transparency: true,
            biomes: true,
            chunk_grid: false,
            worldmap_enabled: true,
        }
    }
}

/// Complete map-engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Live tiles kept before eviction kicks in.
    pub cache_capacity_tiles: usize,
    /// Idle period after the last change before a tile is packed.
    pub compression_idle_ms: u64,
    /// Ticks a chunk change waits in the queue before processing.
    pub change_debounce_ticks: u64,
    /// Interval of the full-refresh fallback; 0 disables it.
    pub periodic_refresh_ms: u64,
    /// Chunk radius around the view center swept by the fallback.
    pub periodic_refresh_radius: i32,
    /// Poll interval while no world is attached.
    pub world_retry_ms: u64,
    /// Render-time toggles.
    pub render: RenderOptions,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cache_capacity_tiles: 150,
            compression_idle_ms: 5000,
            change_debounce_ticks: 20,
            periodic_refresh_ms: 2000,
            periodic_refresh_radius: 4,
            world_retry_ms: 2000,
            render: RenderOptions::default(),
        }
    }
}

impl MapConfig {
    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file
    /// is an error the caller decides how to absorb.
    ///
    /// # Errors
    ///
    /// [`CoreError::ConfigRead`] or [`CoreError::ConfigParse`].
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(CoreError::ConfigRead)?;
        Ok(toml::from_str(&text)?)
    }

    /// Writes the complete configuration table to `path`.
    ///
    /// # Errors
    ///
    /// [`CoreError::ConfigSerialize`] or [`CoreError::ConfigWrite`].
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(CoreError::ConfigWrite)
    }
}
