//! # MERCATOR World
//!
//! The world-facing model consumed by the map engine.
//!
//! ## Design Principles
//!
//! 1. **Narrow seam**: the host world is reached only through [`BlockWorld`]
//! 2. **Deterministic**: the synthetic world is seed-stable across platforms
//! 3. **Registry-driven**: block and biome properties live in data, not code
//!
//! ## Core Components
//!
//! - `MaterialRegistry` / `BiomeRegistry`: block and biome properties
//! - `LightCurve`: combined block/sky light to color multipliers
//! - `SurfaceScanner`: the four-layer column extraction algorithm
//! - `SyntheticWorld`: deterministic terrain for tests, benches and demos

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod biome;
pub mod light;
pub mod material;
pub mod sampler;
pub mod synthetic;

pub use biome::{Biome, BiomeId, BiomeRegistry};
pub use light::{combined_light, LightCurve, LAVA_LIGHT_FLOOR};
pub use material::{Material, MaterialId, MaterialRegistry, TintKind};
pub use sampler::{
    BlockWorld, ColumnSample, ColumnSampler, LayerSample, SurfaceScanner, NO_HEIGHT,
};
pub use synthetic::SyntheticWorld;
