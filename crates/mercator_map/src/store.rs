//! # Tile Persistence
//!
//! Packed tiles move to and from a [`TileStore`] backend on a dedicated
//! worker thread, so region creation and eviction never block on I/O. The
//! worker processes jobs in order; [`StoreWorker::flush`] waits for the
//! queue to drain, which viewport resolution uses to make pending saves
//! visible before loading.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use mercator_core::RegionCoord;

use crate::error::{StoreError, StoreResult};
use crate::tile::RegionTile;

/// A packed-tile persistence backend.
pub trait TileStore: Send + Sync + 'static {
    /// Writes the packed tile for a region, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the backend write fails.
    fn save(&self, region: RegionCoord, bytes: &[u8]) -> StoreResult<()>;

    /// Reads the packed tile for a region. `Ok(None)` means the region was
    /// never saved.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the backend read fails.
    fn load(&self, region: RegionCoord) -> StoreResult<Option<Vec<u8>>>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    tiles: Mutex<HashMap<i64, Vec<u8>>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.lock().len()
    }

    /// True when nothing was saved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.lock().is_empty()
    }
}

impl TileStore for MemoryStore {
    fn save(&self, region: RegionCoord, bytes: &[u8]) -> StoreResult<()> {
        self.tiles.lock().insert(region.packed(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, region: RegionCoord) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.tiles.lock().get(&region.packed()).cloned())
    }
}

/// Directory-of-files backend: one `<x>,<z>.tile` file per region.
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Opens (and creates) the tile directory.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            region: RegionCoord::new(0, 0),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, region: RegionCoord) -> PathBuf {
        self.dir.join(format!("{region}.tile"))
    }
}

impl TileStore for DirStore {
    fn save(&self, region: RegionCoord, bytes: &[u8]) -> StoreResult<()> {
        std::fs::write(self.path_for(region), bytes)
            .map_err(|source| StoreError::Io { region, source })
    }

    fn load(&self, region: RegionCoord) -> StoreResult<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(region)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { region, source }),
        }
    }
}

enum StoreJob {
    Save {
        region: RegionCoord,
        bytes: Vec<u8>,
    },
    Load {
        tile: Arc<RegionTile>,
    },
    Flush {
        ack: Sender<()>,
    },
}

/// Background thread that owns all backend traffic.
pub struct StoreWorker {
    sender: Option<Sender<StoreJob>>,
    handle: Option<JoinHandle<()>>,
}

impl StoreWorker {
    /// Spawns the worker over a backend.
    #[must_use]
    pub fn spawn(store: Arc<dyn TileStore>) -> Self {
        let (sender, receiver) = unbounded::<StoreJob>();
        let handle = std::thread::spawn(move || {
            for job in receiver {
                match job {
                    StoreJob::Save { region, bytes } => {
                        if let Err(err) = store.save(region, &bytes) {
                            warn!(%region, error = %err, "tile save failed");
                        } else {
                            debug!(%region, "tile saved");
                        }
                    }
                    StoreJob::Load { tile } => match store.load(tile.coord()) {
                        Ok(Some(bytes)) => {
                            debug!(region = %tile.coord(), "tile loaded");
                            tile.install_packed(bytes);
                        }
                        Ok(None) => tile.mark_loaded(),
                        Err(err) => {
                            warn!(region = %tile.coord(), error = %err, "tile load failed");
                            tile.mark_loaded();
                        }
                    },
                    StoreJob::Flush { ack } => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    fn submit(&self, job: StoreJob) {
        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                warn!("store worker is gone, dropping job");
            }
        }
    }

    /// Queues a save of a packed tile.
    pub fn save(&self, region: RegionCoord, bytes: Vec<u8>) {
        self.submit(StoreJob::Save { region, bytes });
    }

    /// Queues a load into the given tile. The tile's loaded flag is set
    /// once the load completes, hit or miss.
    pub fn request_load(&self, tile: Arc<RegionTile>) {
        self.submit(StoreJob::Load { tile });
    }

    /// Blocks until every previously queued job has been processed.
    pub fn flush(&self) {
        let (ack, done) = bounded(1);
        self.submit(StoreJob::Flush { ack });
        let _ = done.recv();
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
