//! Cache-fill queue.
//!
//! Tiles fetched on the request path are persisted off that path: the
//! request hands `(tile, bytes)` to a bounded channel with `try_send` and
//! returns. A single writer task drains the channel and runs at most
//! `concurrency` saves at once. A full queue drops the write.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::cache::TileCache;
use crate::coord::Tile;
use crate::telemetry::Measurements;

/// Default number of pending cache writes.
pub const DEFAULT_FILL_QUEUE_CAPACITY: usize = 1024;

/// Default number of concurrent cache writes.
pub const DEFAULT_FILL_CONCURRENCY: usize = 8;

/// Sizing of the cache-fill queue.
#[derive(Debug, Clone, Copy)]
pub struct FillSettings {
    pub capacity: usize,
    pub concurrency: usize,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_FILL_QUEUE_CAPACITY,
            concurrency: DEFAULT_FILL_CONCURRENCY,
        }
    }
}

struct FillRequest {
    tile: Tile,
    bytes: Bytes,
}

pub(crate) struct FillQueue {
    sender: Mutex<Option<mpsc::Sender<FillRequest>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl FillQueue {
    /// Spawns the writer task.
    pub(crate) fn start(
        cache: Arc<TileCache>,
        measurements: Arc<Measurements>,
        settings: FillSettings,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(settings.capacity.max(1));
        let writer = tokio::spawn(run_writer(
            receiver,
            cache,
            measurements,
            settings.concurrency.max(1),
        ));

        Self {
            sender: Mutex::new(Some(sender)),
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Queues a write without waiting. Returns false if it was dropped.
    pub(crate) fn enqueue(&self, tile: Tile, bytes: Bytes) -> bool {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            debug!(tile = %tile, "Cache-fill queue closed, write dropped");
            return false;
        };

        match sender.try_send(FillRequest { tile, bytes }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(request)) => {
                warn!(tile = %request.tile, "Cache-fill queue full, write dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(request)) => {
                debug!(tile = %request.tile, "Cache-fill queue closed, write dropped");
                false
            }
        }
    }

    /// Closes the queue and waits until every queued write finished.
    pub(crate) async fn close(&self) {
        drop(self.sender.lock().take());
        let writer = self.writer.lock().take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(error = %e, "Cache-fill writer panicked");
            }
        }
    }
}

async fn run_writer(
    mut receiver: mpsc::Receiver<FillRequest>,
    cache: Arc<TileCache>,
    measurements: Arc<Measurements>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut writes = JoinSet::new();

    while let Some(request) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let cache = Arc::clone(&cache);
        let measurements = Arc::clone(&measurements);

        writes.spawn(async move {
            save_tile(&cache, &measurements, &request.tile, &request.bytes).await;
            drop(permit);
        });

        // Reap finished writes so the set does not grow unbounded
        while writes.try_join_next().is_some() {}
    }

    while writes.join_next().await.is_some() {}
    debug!("Cache-fill writer stopped");
}

/// Persists one tile, recording the `saveTileToCache` timing.
///
/// Failures are logged and reported through the return value.
pub(crate) async fn save_tile(
    cache: &TileCache,
    measurements: &Measurements,
    tile: &Tile,
    bytes: &[u8],
) -> bool {
    let mut monitor = measurements.monitor("saveTileToCache");
    match cache.save(tile, bytes).await {
        Ok(()) => true,
        Err(e) => {
            monitor.set_error();
            warn!(tile = %tile, error = %e, "Failed to save tile to cache");
            false
        }
    }
}
