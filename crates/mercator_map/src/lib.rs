//! # MERCATOR Map
//!
//! The map engine: region tile cache, change pipeline, pixel compositing
//! and persistence.
//!
//! ## Design Principles
//!
//! 1. **Tick-driven**: all mutation funnels through the owning tick loop;
//!    other threads only queue work
//! 2. **Chunk-granular**: staleness, resampling and recompositing all
//!    operate on 16x16 chunks, never whole regions
//! 3. **I/O off-thread**: the store worker owns every backend read and
//!    write; the tick loop never blocks on disk
//!
//! ## Core Components
//!
//! - [`MapSession`]: the facade a host embeds
//! - [`RegionCache`]: tile cache with eviction and idle compression
//! - [`RegionTile`]: one 256x256 region of layers and pixels
//! - [`ViewportResolver`]: window-of-regions resolution
//! - [`ChangePipeline`]: debounced chunk-change queue
//! - [`ColorCompositor`]: layers-to-ARGB pixel compositing
//! - [`TileStore`]: persistence seam, with in-memory and directory backends

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod compositor;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod tile;
pub mod tracker;
pub mod viewport;

pub use cache::{PruneReport, RegionCache};
pub use compositor::{ColorCompositor, RenderContext};
pub use error::{StoreError, StoreResult};
pub use overlay::{GridOverlay, PathOverlay};
pub use pipeline::ChangePipeline;
pub use session::{MapSession, RenderStats, SharedWorld, TickReport, WorldSource};
pub use store::{DirStore, MemoryStore, StoreWorker, TileStore};
pub use tile::{ChunkBitmap, Layer, RegionTile, TileLayers};
pub use tracker::ChunkTracker;
pub use viewport::{ResolvedView, ViewportResolver, ViewportWindow};
