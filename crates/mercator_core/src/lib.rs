//! # MERCATOR Core
//!
//! Shared primitives for the world-map engine.
//!
//! ## Design Principles
//!
//! 1. **Small and boring**: coordinates, color math, config, errors
//! 2. **Deterministic**: no clocks, no randomness, no global state
//! 3. **Allocation-free**: every type here is `Copy` except the config
//!
//! ## Core Components
//!
//! - `RegionCoord` / `ChunkCoord`: map-space addressing and cache keys
//! - `Argb`: packed ARGB color with the compositor's blend operations
//! - `MapConfig` / `RenderOptions`: the TOML-backed engine configuration
//!
//! ## Example
//!
//! ```rust
//! use mercator_core::{ChunkCoord, RegionCoord};
//!
//! let chunk = ChunkCoord::from_block(-1, 300);
//! assert_eq!(chunk, ChunkCoord::new(-1, 18));
//! assert_eq!(chunk.region(), RegionCoord::new(-1, 1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod color;
pub mod config;
pub mod coords;
pub mod error;

pub use color::Argb;
pub use config::{BiomeOverlay, MapConfig, RenderOptions};
pub use coords::{
    column_index, local_column, ChunkCoord, RegionCoord, CHUNKS_PER_REGION, CHUNK_SIZE,
    REGION_SIZE,
};
pub use error::{CoreError, CoreResult};
