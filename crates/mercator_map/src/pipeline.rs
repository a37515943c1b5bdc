//! # Change Pipeline
//!
//! Chunk-change notifications arrive from any thread, get stamped with the
//! current tick, and sit in a FIFO until they are `debounce_ticks` old.
//! The debounce absorbs the burst of notifications a single edit produces
//! (block events, then lighting, then neighbor updates) into one resample.
//!
//! The pipeline also carries the deferred prune request: any thread may
//! raise it, and the owning tick loop consumes it at a safe point.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::trace;

use mercator_core::ChunkCoord;

/// One queued chunk change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingChange {
    chunk: ChunkCoord,
    tick: u64,
}

/// Debounced, tick-driven chunk-change queue.
pub struct ChangePipeline {
    sender: Sender<PendingChange>,
    receiver: Receiver<PendingChange>,
    queue: Mutex<VecDeque<PendingChange>>,
    current_tick: AtomicU64,
    debounce_ticks: u64,
    prune_requested: AtomicBool,
}

impl ChangePipeline {
    /// Creates a pipeline with the given debounce window.
    #[must_use]
    pub fn new(debounce_ticks: u64) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            queue: Mutex::new(VecDeque::new()),
            current_tick: AtomicU64::new(0),
            debounce_ticks,
            prune_requested: AtomicBool::new(false),
        }
    }

    /// Current tick counter.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Relaxed)
    }

    /// Advances the tick counter. Called once per engine tick by the
    /// owning loop; returns the new tick.
    pub fn advance_tick(&self) -> u64 {
        self.current_tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records a chunk change, stamped with the current tick. Callable
    /// from any thread.
    pub fn notify(&self, chunk: ChunkCoord) {
        let change = PendingChange {
            chunk,
            tick: self.current_tick(),
        };
        trace!(%chunk, tick = change.tick, "chunk change queued");
        let _ = self.sender.send(change);
    }

    /// Raises the deferred prune request.
    pub fn request_prune(&self) {
        self.prune_requested.store(true, Ordering::Relaxed);
    }

    /// Consumes the prune request, if raised.
    #[must_use]
    pub fn take_prune_request(&self) -> bool {
        self.prune_requested.swap(false, Ordering::Relaxed)
    }

    /// Moves arrived changes into the queue and pops every change whose
    /// debounce window has elapsed, oldest first.
    pub fn drain(&self) -> Vec<ChunkCoord> {
        let tick = self.current_tick();
        let mut queue = self.queue.lock();
        for change in self.receiver.try_iter() {
            queue.push_back(change);
        }
        let mut ready = Vec::new();
        while let Some(head) = queue.front() {
            if tick < head.tick + self.debounce_ticks {
                break;
            }
            if let Some(change) = queue.pop_front() {
                ready.push(change.chunk);
            }
        }
        ready
    }

    /// Discards everything queued. Used when detaching from a world.
    pub fn clear(&self) {
        let mut queue = self.queue.lock();
        for _ in self.receiver.try_iter() {}
        queue.clear();
    }

    /// Number of changes waiting, arrived or not yet collected.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len() + self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_waits_out_the_debounce() {
        let pipeline = ChangePipeline::new(3);
        pipeline.notify(ChunkCoord::new(1, 1));
        assert!(pipeline.drain().is_empty());
        pipeline.advance_tick();
        pipeline.advance_tick();
        assert!(pipeline.drain().is_empty());
        pipeline.advance_tick();
        assert_eq!(pipeline.drain(), vec![ChunkCoord::new(1, 1)]);
        assert!(pipeline.drain().is_empty());
    }

    #[test]
    fn test_fifo_order_and_partial_release() {
        let pipeline = ChangePipeline::new(2);
        pipeline.notify(ChunkCoord::new(0, 0));
        pipeline.advance_tick();
        pipeline.notify(ChunkCoord::new(1, 0));
        pipeline.advance_tick();
        // Only the first change is two ticks old.
        assert_eq!(pipeline.drain(), vec![ChunkCoord::new(0, 0)]);
        pipeline.advance_tick();
        assert_eq!(pipeline.drain(), vec![ChunkCoord::new(1, 0)]);
    }

    #[test]
    fn test_zero_debounce_releases_immediately() {
        let pipeline = ChangePipeline::new(0);
        pipeline.notify(ChunkCoord::new(5, 5));
        assert_eq!(pipeline.drain(), vec![ChunkCoord::new(5, 5)]);
    }

    #[test]
    fn test_clear_discards_pending() {
        let pipeline = ChangePipeline::new(1);
        pipeline.notify(ChunkCoord::new(0, 0));
        pipeline.notify(ChunkCoord::new(1, 1));
        assert_eq!(pipeline.pending(), 2);
        pipeline.clear();
        assert_eq!(pipeline.pending(), 0);
        pipeline.advance_tick();
        assert!(pipeline.drain().is_empty());
    }

    #[test]
    fn test_prune_request_is_one_shot() {
        let pipeline = ChangePipeline::new(1);
        assert!(!pipeline.take_prune_request());
        pipeline.request_prune();
        pipeline.request_prune();
        assert!(pipeline.take_prune_request());
        assert!(!pipeline.take_prune_request());
    }

    #[test]
    fn test_cross_thread_notify() {
        let pipeline = std::sync::Arc::new(ChangePipeline::new(0));
        let clone = pipeline.clone();
        std::thread::spawn(move || clone.notify(ChunkCoord::new(7, 7)))
            .join()
            .unwrap();
        assert_eq!(pipeline.drain(), vec![ChunkCoord::new(7, 7)]);
    }
}
