//! # Region Tiles
//!
//! One [`RegionTile`] caches a 256x256-column region in two stages: the four
//! sampled layer planes plus biomes, and the composited pixel raster. Two
//! chunk-granular dirty bitmaps drive incremental updates:
//!
//! - `stale_columns`: chunks whose world columns must be resampled
//! - `stale_pixels`: chunks whose pixels must be recomposited
//!
//! A resample marks the chunk and its in-region neighbors pixel-stale, since
//! slope shading reads diagonal neighbor columns.
//!
//! Tile payloads move between three states: `Live` (usable planes),
//! `Packed` (LZ4 block, produced after an idle period or for persistence)
//! and `Released` (no payload; the shared sentinel stays here forever).
//! Pixels are never packed; unpacking marks every chunk pixel-stale instead.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use mercator_core::{column_index, Argb, ChunkCoord, RegionCoord, CHUNK_SIZE, REGION_SIZE};
use mercator_world::{
    BiomeId, BlockWorld, ColumnSample, ColumnSampler, LayerSample, MaterialId, MaterialRegistry,
    SurfaceScanner, NO_HEIGHT,
};

use crate::compositor::RenderContext;
use crate::error::{StoreError, StoreResult};

/// Columns per region.
pub const REGION_AREA: usize = (REGION_SIZE * REGION_SIZE) as usize;
/// Chunks per region.
pub const REGION_CHUNKS: usize = 256;
/// Layer planes per tile.
pub const LAYER_COUNT: usize = 4;

/// The four sampled layers, in plane order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    /// Solid floor beneath a liquid surface.
    OceanFloor = 0,
    /// Skylight-occluding surface.
    Surface = 1,
    /// Canopy block above the surface.
    Foliage = 2,
    /// Transparent motion-blocking layer.
    Transparent = 3,
}

impl Layer {
    /// All layers in plane order.
    pub const ALL: [Self; LAYER_COUNT] = [
        Self::OceanFloor,
        Self::Surface,
        Self::Foliage,
        Self::Transparent,
    ];

    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// One bit per chunk of a region, row-major `(cz * 16 + cx)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkBitmap {
    bits: [u64; REGION_CHUNKS / 64],
}

impl ChunkBitmap {
    /// Empty bitmap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: [0; REGION_CHUNKS / 64],
        }
    }

    /// Bitmap with every chunk set.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            bits: [u64::MAX; REGION_CHUNKS / 64],
        }
    }

    /// Sets the bit for a local chunk.
    pub fn set(&mut self, cx: usize, cz: usize) {
        let bit = cz * 16 + cx;
        self.bits[bit / 64] |= 1 << (bit % 64);
    }

    /// Sets every bit.
    pub fn set_all(&mut self) {
        self.bits = [u64::MAX; REGION_CHUNKS / 64];
    }

    /// Reads the bit for a local chunk.
    #[must_use]
    pub fn get(&self, cx: usize, cz: usize) -> bool {
        let bit = cz * 16 + cx;
        self.bits[bit / 64] & (1 << (bit % 64)) != 0
    }

    /// True when no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates set bits as local `(cx, cz)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..REGION_CHUNKS)
            .filter(move |bit| self.bits[bit / 64] & (1 << (bit % 64)) != 0)
            .map(|bit| (bit % 16, bit / 16))
    }

    /// Merges another bitmap into this one.
    pub fn union(&mut self, other: &Self) {
        for (word, add) in self.bits.iter_mut().zip(other.bits) {
            *word |= add;
        }
    }
}

/// One layer plane in struct-of-arrays form.
pub struct LayerPlane {
    /// Layer heights, [`NO_HEIGHT`] for absent.
    pub heights: Box<[i16]>,
    /// Raw material ids.
    pub materials: Box<[u16]>,
    /// Combined block/sky light per column.
    pub lights: Box<[u8]>,
}

impl LayerPlane {
    fn new() -> Self {
        Self {
            heights: vec![NO_HEIGHT; REGION_AREA].into_boxed_slice(),
            materials: vec![0; REGION_AREA].into_boxed_slice(),
            lights: vec![0; REGION_AREA].into_boxed_slice(),
        }
    }

    fn sample(&self, index: usize) -> LayerSample {
        LayerSample {
            height: self.heights[index],
            material: MaterialId(self.materials[index]),
            light: self.lights[index],
        }
    }

    fn store(&mut self, index: usize, sample: LayerSample) {
        self.heights[index] = sample.height;
        self.materials[index] = sample.material.0;
        self.lights[index] = sample.light;
    }
}

/// The sampled and composited payload of one region.
pub struct TileLayers {
    /// The four layer planes, indexed by [`Layer`].
    pub planes: [LayerPlane; LAYER_COUNT],
    /// Raw biome ids per column.
    pub biomes: Box<[u16]>,
    /// Composited ARGB pixels per column.
    pub pixels: Box<[Argb]>,
}

impl TileLayers {
    /// Blank payload: no heights, sentinel biomes, transparent pixels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            planes: [
                LayerPlane::new(),
                LayerPlane::new(),
                LayerPlane::new(),
                LayerPlane::new(),
            ],
            biomes: vec![BiomeId::SENTINEL.0; REGION_AREA].into_boxed_slice(),
            pixels: vec![Argb::TRANSPARENT; REGION_AREA].into_boxed_slice(),
        }
    }

    /// Writes a sampled column into all planes.
    pub fn set_column(&mut self, lx: usize, lz: usize, sample: &ColumnSample) {
        let index = column_index(lx, lz);
        self.planes[Layer::OceanFloor.index()].store(index, sample.ocean_floor);
        self.planes[Layer::Surface.index()].store(index, sample.surface);
        self.planes[Layer::Foliage.index()].store(index, sample.foliage);
        self.planes[Layer::Transparent.index()].store(index, sample.transparent);
        self.biomes[index] = sample.biome.0;
    }

    /// Reads a column back out of the planes.
    #[must_use]
    pub fn column(&self, lx: usize, lz: usize) -> ColumnSample {
        let index = column_index(lx, lz);
        ColumnSample {
            ocean_floor: self.planes[Layer::OceanFloor.index()].sample(index),
            surface: self.planes[Layer::Surface.index()].sample(index),
            foliage: self.planes[Layer::Foliage.index()].sample(index),
            transparent: self.planes[Layer::Transparent.index()].sample(index),
            biome: BiomeId(self.biomes[index]),
        }
    }

    /// Splits the payload into an immutable layer view and the mutable
    /// pixel raster, so compositing can read neighbors while writing.
    pub fn split_render(&mut self) -> (LayerView<'_>, &mut [Argb]) {
        (
            LayerView {
                planes: &self.planes,
                biomes: &self.biomes,
            },
            &mut self.pixels,
        )
    }
}

impl Default for TileLayers {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the layer planes handed to the compositor.
#[derive(Clone, Copy)]
pub struct LayerView<'a> {
    planes: &'a [LayerPlane; LAYER_COUNT],
    biomes: &'a [u16],
}

impl LayerView<'_> {
    /// Layer sample at a local column.
    #[must_use]
    pub fn layer(&self, layer: Layer, lx: usize, lz: usize) -> LayerSample {
        self.planes[layer.index()].sample(column_index(lx, lz))
    }

    /// Layer height at a local column.
    #[must_use]
    pub fn height(&self, layer: Layer, lx: usize, lz: usize) -> i16 {
        self.planes[layer.index()].heights[column_index(lx, lz)]
    }

    /// Biome at a local column.
    #[must_use]
    pub fn biome(&self, lx: usize, lz: usize) -> BiomeId {
        BiomeId(self.biomes[column_index(lx, lz)])
    }
}

/// Payload state of a tile.
pub enum TileData {
    /// Planes and pixels available in memory.
    Live(Box<TileLayers>),
    /// Planes held as a packed block; pixels discarded.
    Packed(Vec<u8>),
    /// No payload.
    Released,
}

impl TileData {
    /// Inflates `Packed` or `Released` into `Live`.
    fn inflate(&mut self) -> StoreResult<()> {
        match self {
            Self::Live(_) => Ok(()),
            Self::Packed(bytes) => {
                let (layers, _) = codec::unpack(bytes)?;
                *self = Self::Live(Box::new(layers));
                Ok(())
            }
            Self::Released => {
                *self = Self::Live(Box::new(TileLayers::new()));
                Ok(())
            }
        }
    }

    fn live_mut(&mut self) -> Option<&mut TileLayers> {
        match self {
            Self::Live(layers) => Some(layers),
            Self::Packed(_) | Self::Released => None,
        }
    }

    fn live(&self) -> Option<&TileLayers> {
        match self {
            Self::Live(layers) => Some(layers),
            Self::Packed(_) | Self::Released => None,
        }
    }
}

/// The packed tile codec: a 2-byte header followed by one LZ4 block holding
/// the concatenated plane arrays and biomes. Pixels are excluded; they are
/// recomposited after unpacking.
pub mod codec {
    use super::{LayerPlane, StoreError, StoreResult, TileLayers, LAYER_COUNT, REGION_AREA};

    /// Format version this build reads and writes.
    pub const VERSION: u8 = 1;
    /// Header flag: the tile held no sampled terrain.
    pub const FLAG_EMPTY: u8 = 0b1;

    /// Decompressed payload length: four planes of heights, materials and
    /// lights, then the biome array.
    pub const PAYLOAD_LEN: usize = LAYER_COUNT * (REGION_AREA * 2 + REGION_AREA * 2 + REGION_AREA)
        + REGION_AREA * 2;

    /// Packs the layer planes and biomes into the stored form.
    #[must_use]
    pub fn pack(layers: &TileLayers, empty: bool) -> Vec<u8> {
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        for plane in &layers.planes {
            payload.extend_from_slice(bytemuck::cast_slice(&plane.heights));
            payload.extend_from_slice(bytemuck::cast_slice(&plane.materials));
            payload.extend_from_slice(&plane.lights);
        }
        payload.extend_from_slice(bytemuck::cast_slice(&layers.biomes));

        let compressed = lz4_flex::compress_prepend_size(&payload);
        let mut out = Vec::with_capacity(2 + compressed.len());
        out.push(VERSION);
        out.push(if empty { FLAG_EMPTY } else { 0 });
        out.extend_from_slice(&compressed);
        out
    }

    /// Inverse of [`pack`]. Returns the layers and the empty flag.
    ///
    /// # Errors
    ///
    /// [`StoreError::Truncated`], [`StoreError::UnsupportedVersion`],
    /// [`StoreError::Decompress`] or [`StoreError::PayloadLength`].
    pub fn unpack(bytes: &[u8]) -> StoreResult<(TileLayers, bool)> {
        let [version, flags, compressed @ ..] = bytes else {
            return Err(StoreError::Truncated);
        };
        if *version != VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: *version,
                expected: VERSION,
            });
        }
        let payload = lz4_flex::decompress_size_prepended(compressed)?;
        if payload.len() != PAYLOAD_LEN {
            return Err(StoreError::PayloadLength {
                found: payload.len(),
                expected: PAYLOAD_LEN,
            });
        }

        fn take<'a>(payload: &'a [u8], offset: &mut usize, len: usize) -> &'a [u8] {
            let slice = &payload[*offset..*offset + len];
            *offset += len;
            slice
        }

        fn read_plane(payload: &[u8], offset: &mut usize) -> LayerPlane {
            LayerPlane {
                heights: bytemuck::pod_collect_to_vec::<u8, i16>(take(
                    payload,
                    offset,
                    REGION_AREA * 2,
                ))
                .into_boxed_slice(),
                materials: bytemuck::pod_collect_to_vec::<u8, u16>(take(
                    payload,
                    offset,
                    REGION_AREA * 2,
                ))
                .into_boxed_slice(),
                lights: take(payload, offset, REGION_AREA).to_vec().into_boxed_slice(),
            }
        }

        let mut offset = 0;
        let planes = [
            read_plane(&payload, &mut offset),
            read_plane(&payload, &mut offset),
            read_plane(&payload, &mut offset),
            read_plane(&payload, &mut offset),
        ];
        let biomes =
            bytemuck::pod_collect_to_vec::<u8, u16>(take(&payload, &mut offset, REGION_AREA * 2))
                .into_boxed_slice();

        let layers = TileLayers {
            planes,
            biomes,
            pixels: vec![super::Argb::TRANSPARENT; REGION_AREA].into_boxed_slice(),
        };
        Ok((layers, flags & FLAG_EMPTY != 0))
    }
}

/// One cached region.
pub struct RegionTile {
    coord: RegionCoord,
    sentinel: bool,
    data: RwLock<TileData>,
    stale_columns: Mutex<ChunkBitmap>,
    stale_pixels: Mutex<ChunkBitmap>,
    /// A store load was attempted (hit or miss) for this tile.
    loaded: AtomicBool,
    /// No sampled column had any terrain.
    empty: AtomicBool,
    most_recent_view: AtomicU64,
    most_recent_change: AtomicU64,
}

impl RegionTile {
    /// Fresh tile: blank payload, every chunk column- and pixel-stale.
    #[must_use]
    pub fn new(coord: RegionCoord, now_ms: u64) -> Self {
        Self {
            coord,
            sentinel: false,
            data: RwLock::new(TileData::Live(Box::new(TileLayers::new()))),
            stale_columns: Mutex::new(ChunkBitmap::full()),
            stale_pixels: Mutex::new(ChunkBitmap::full()),
            loaded: AtomicBool::new(false),
            empty: AtomicBool::new(true),
            most_recent_view: AtomicU64::new(now_ms),
            most_recent_change: AtomicU64::new(now_ms),
        }
    }

    /// The inert stand-in swapped over evicted dead-weight tiles. All
    /// mutations no-op; all reads see an empty region.
    #[must_use]
    pub fn sentinel(coord: RegionCoord) -> Self {
        Self {
            coord,
            sentinel: true,
            data: RwLock::new(TileData::Released),
            stale_columns: Mutex::new(ChunkBitmap::new()),
            stale_pixels: Mutex::new(ChunkBitmap::new()),
            loaded: AtomicBool::new(true),
            empty: AtomicBool::new(true),
            most_recent_view: AtomicU64::new(0),
            most_recent_change: AtomicU64::new(0),
        }
    }

    /// Region this tile caches.
    #[must_use]
    pub fn coord(&self) -> RegionCoord {
        self.coord
    }

    /// True for the inert stand-in.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    /// True when no sampled column had terrain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.empty.load(Ordering::Relaxed)
    }

    /// True once a store load was attempted for this tile.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Relaxed)
    }

    /// True while the payload is inflated.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(&*self.data.read(), TileData::Live(_))
    }

    /// True while the payload is packed.
    #[must_use]
    pub fn is_packed(&self) -> bool {
        matches!(&*self.data.read(), TileData::Packed(_))
    }

    /// Last time the tile was in a resolved viewport.
    #[must_use]
    pub fn most_recent_view(&self) -> u64 {
        self.most_recent_view.load(Ordering::Relaxed)
    }

    /// Last time a chunk change touched the tile.
    #[must_use]
    pub fn most_recent_change(&self) -> u64 {
        self.most_recent_change.load(Ordering::Relaxed)
    }

    /// Records a viewport touch. Monotonic: an older timestamp never
    /// regresses the stored one.
    pub fn touch_view(&self, now_ms: u64) {
        self.most_recent_view.fetch_max(now_ms, Ordering::Relaxed);
    }

    fn touch_change(&self, now_ms: u64) {
        self.most_recent_change.fetch_max(now_ms, Ordering::Relaxed);
    }

    /// Marks a store load as attempted without data (fresh region).
    pub fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Relaxed);
    }

    /// Installs a packed payload from the store. Every chunk becomes
    /// pixel-stale; column state is considered current.
    pub fn install_packed(&self, bytes: Vec<u8>) {
        if self.sentinel {
            return;
        }
        let empty = bytes.get(1).is_some_and(|f| f & codec::FLAG_EMPTY != 0);
        *self.data.write() = TileData::Packed(bytes);
        self.empty.store(empty, Ordering::Relaxed);
        self.loaded.store(true, Ordering::Relaxed);
        *self.stale_columns.lock() = ChunkBitmap::new();
        self.stale_pixels.lock().set_all();
    }

    /// Marks one chunk for resampling (and recompositing).
    pub fn mark_chunk_stale(&self, chunk: ChunkCoord, now_ms: u64) {
        if self.sentinel {
            return;
        }
        let (cx, cz) = chunk.local_in_region();
        self.stale_columns.lock().set(cx, cz);
        self.touch_change(now_ms);
    }

    /// Marks every chunk for resampling.
    pub fn mark_all_columns_stale(&self, now_ms: u64) {
        if self.sentinel {
            return;
        }
        self.stale_columns.lock().set_all();
        self.touch_change(now_ms);
    }

    /// Marks every chunk for recompositing without resampling. Used when
    /// render options, the light curve or an overlay change.
    pub fn mark_all_pixels_stale(&self) {
        if self.sentinel {
            return;
        }
        self.stale_pixels.lock().set_all();
    }

    /// True when chunks await resampling.
    #[must_use]
    pub fn has_stale_columns(&self) -> bool {
        !self.stale_columns.lock().is_empty()
    }

    /// True when chunks await recompositing.
    #[must_use]
    pub fn has_stale_pixels(&self) -> bool {
        !self.stale_pixels.lock().is_empty()
    }

    /// Resamples every column-stale chunk from the world. Returns the
    /// number of chunks resampled.
    pub fn resample(
        &self,
        world: &dyn BlockWorld,
        materials: &MaterialRegistry,
        now_ms: u64,
    ) -> usize {
        if self.sentinel {
            return 0;
        }
        let pending = {
            let mut stale = self.stale_columns.lock();
            std::mem::take(&mut *stale)
        };
        if pending.is_empty() {
            return 0;
        }

        let mut data = self.data.write();
        if let Err(err) = data.inflate() {
            warn!(region = %self.coord, error = %err, "discarding unreadable packed tile");
            *data = TileData::Live(Box::new(TileLayers::new()));
            self.stale_pixels.lock().set_all();
        }
        let Some(layers) = data.live_mut() else {
            return 0;
        };

        let scanner = SurfaceScanner::new(world, materials);
        let (origin_x, origin_z) = self.coord.block_origin();
        let mut touched_pixels = ChunkBitmap::new();
        let mut any_terrain = false;
        let mut resampled = 0;

        for (cx, cz) in pending.iter() {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            let (base_x, base_z) = (
                origin_x + cx as i32 * CHUNK_SIZE,
                origin_z + cz as i32 * CHUNK_SIZE,
            );
            for dz in 0..CHUNK_SIZE as usize {
                for dx in 0..CHUNK_SIZE as usize {
                    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
                    let sample = scanner.sample(base_x + dx as i32, base_z + dz as i32);
                    if sample.surface.height != NO_HEIGHT {
                        any_terrain = true;
                    }
                    layers.set_column(
                        cx * CHUNK_SIZE as usize + dx,
                        cz * CHUNK_SIZE as usize + dz,
                        &sample,
                    );
                }
            }
            resampled += 1;

            // Slope shading reads diagonal neighbors, so the surrounding
            // chunks must recomposite too.
            for nz in cz.saturating_sub(1)..=(cz + 1).min(15) {
                for nx in cx.saturating_sub(1)..=(cx + 1).min(15) {
                    touched_pixels.set(nx, nz);
                }
            }
        }
        drop(data);

        if any_terrain {
            self.empty.store(false, Ordering::Relaxed);
        }
        self.stale_pixels.lock().union(&touched_pixels);
        self.touch_change(now_ms);
        resampled
    }

    /// Recomposites every pixel-stale chunk. Returns the number of chunks
    /// recomposited.
    pub fn render(&self, ctx: &RenderContext<'_>) -> usize {
        if self.sentinel {
            return 0;
        }
        let pending = {
            let mut stale = self.stale_pixels.lock();
            std::mem::take(&mut *stale)
        };
        if pending.is_empty() {
            return 0;
        }

        let mut data = self.data.write();
        if let Err(err) = data.inflate() {
            warn!(region = %self.coord, error = %err, "discarding unreadable packed tile");
            *data = TileData::Live(Box::new(TileLayers::new()));
            self.stale_columns.lock().set_all();
        }
        let Some(layers) = data.live_mut() else {
            return 0;
        };

        let (origin_x, origin_z) = self.coord.block_origin();
        let (view, pixels) = layers.split_render();
        let mut rendered = 0;
        for (cx, cz) in pending.iter() {
            for dz in 0..CHUNK_SIZE as usize {
                for dx in 0..CHUNK_SIZE as usize {
                    let lx = cx * CHUNK_SIZE as usize + dx;
                    let lz = cz * CHUNK_SIZE as usize + dz;
                    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
                    let (block_x, block_z) = (origin_x + lx as i32, origin_z + lz as i32);
                    pixels[column_index(lx, lz)] = ctx.composite(view, lx, lz, block_x, block_z);
                }
            }
            rendered += 1;
        }
        rendered
    }

    /// Sampled column at local coordinates, inflating a packed payload if
    /// needed. `None` for the sentinel.
    #[must_use]
    pub fn column(&self, lx: usize, lz: usize) -> Option<ColumnSample> {
        if self.sentinel {
            return None;
        }
        let mut data = self.data.write();
        if data.inflate().is_err() {
            return None;
        }
        data.live().map(|layers| layers.column(lx, lz))
    }

    /// Composited pixel at local coordinates. Transparent while packed.
    #[must_use]
    pub fn pixel(&self, lx: usize, lz: usize) -> Argb {
        self.data
            .read()
            .live()
            .map_or(Argb::TRANSPARENT, |layers| {
                layers.pixels[column_index(lx, lz)]
            })
    }

    /// Copies one pixel row into `out`. Returns false while packed.
    pub fn copy_pixel_row(&self, lz: usize, out: &mut [Argb]) -> bool {
        let data = self.data.read();
        let Some(layers) = data.live() else {
            return false;
        };
        let start = column_index(0, lz);
        out.copy_from_slice(&layers.pixels[start..start + out.len()]);
        true
    }

    /// Packs the current payload for the store. `None` for the sentinel and
    /// for released tiles.
    #[must_use]
    pub fn pack_bytes(&self) -> Option<Vec<u8>> {
        let data = self.data.read();
        match &*data {
            TileData::Live(layers) => Some(codec::pack(layers, self.is_empty())),
            TileData::Packed(bytes) => Some(bytes.clone()),
            TileData::Released => None,
        }
    }

    /// Packs the in-memory payload when the tile has been neither viewed
    /// nor changed for `idle_ms`. Returns true if a pack happened.
    ///
    /// Idleness requires BOTH stamps to age out: a tile an open view keeps
    /// reading stays live even when nothing in it changes.
    pub fn compress_if_idle(&self, now_ms: u64, idle_ms: u64) -> bool {
        if self.sentinel {
            return false;
        }
        if now_ms.saturating_sub(self.most_recent_view()) < idle_ms
            || now_ms.saturating_sub(self.most_recent_change()) < idle_ms
        {
            return false;
        }
        let mut data = self.data.write();
        let TileData::Live(layers) = &*data else {
            return false;
        };
        let packed = codec::pack(layers, self.is_empty());
        *data = TileData::Packed(packed);
        drop(data);
        self.stale_pixels.lock().set_all();
        true
    }
}
