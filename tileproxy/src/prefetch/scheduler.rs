//! Pyramid-walk prefetch scheduler.
//!
//! A producer enumerates every tile of every requested provider from zoom 0
//! up to the maximum zoom and feeds a bounded queue. A fixed pool of workers
//! drains the queue through [`TileService::prefetch_tile`], so the number of
//! concurrent upstream fetches never exceeds the worker count.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::{Tile, MAX_ZOOM};
use crate::service::TileService;

use super::config::PREFETCH_QUEUE_CAPACITY;

/// Totals of one prefetch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Tiles handed to the workers
    pub queued: u64,
    /// Tiles fetched and cached
    pub fetched: u64,
    /// Tiles already cached or not prefetchable
    pub skipped: u64,
    /// Tiles whose fetch failed
    pub failed: u64,
}

impl fmt::Display for PrefetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "queued {}, fetched {}, skipped {}, failed {}",
            self.queued, self.fetched, self.skipped, self.failed
        )
    }
}

#[derive(Default)]
struct Counters {
    queued: AtomicU64,
    fetched: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn report(&self) -> PrefetchReport {
        PrefetchReport {
            queued: self.queued.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Walks tile pyramids with a bounded worker pool.
pub struct PrefetchScheduler {
    service: Arc<TileService>,
    workers: usize,
    cancel: CancellationToken,
}

impl PrefetchScheduler {
    /// Creates a scheduler running `workers` concurrent fetches.
    pub fn new(service: Arc<TileService>, workers: usize) -> Self {
        Self {
            service,
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Stops the walk early when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Prefetches every tile of `providers` for zoom levels `0..=max_zoom`.
    ///
    /// Returns once all workers have finished.
    pub async fn run(&self, providers: &[String], max_zoom: u8) -> PrefetchReport {
        let max_zoom = if max_zoom > MAX_ZOOM {
            warn!(max_zoom, limit = MAX_ZOOM, "Prefetch zoom clamped");
            MAX_ZOOM
        } else {
            max_zoom
        };

        info!(
            providers = ?providers,
            max_zoom,
            workers = self.workers,
            "Prefetch started"
        );

        let counters = Arc::new(Counters::default());
        let (sender, receiver) = mpsc::channel::<Tile>(PREFETCH_QUEUE_CAPACITY);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            handles.push(tokio::spawn(worker(
                id,
                Arc::clone(&self.service),
                Arc::clone(&receiver),
                Arc::clone(&counters),
            )));
        }

        self.produce(providers, max_zoom, sender, &counters).await;

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Prefetch worker panicked");
            }
        }

        let report = counters.report();
        info!(report = %report, "Prefetch finished");
        report
    }

    async fn produce(
        &self,
        providers: &[String],
        max_zoom: u8,
        sender: mpsc::Sender<Tile>,
        counters: &Counters,
    ) {
        for provider in providers {
            for z in 0..=max_zoom {
                debug!(provider = %provider, z, "Prefetching zoom level");
                let size = 1u32 << z;
                for x in 0..size {
                    for y in 0..size {
                        let tile = Tile::new(provider.as_str(), z, x, y);
                        if self.service.is_cached(&tile).await {
                            counters.skipped.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }

                        tokio::select! {
                            biased;
                            _ = self.cancel.cancelled() => {
                                info!("Prefetch cancelled");
                                return;
                            }
                            sent = sender.send(tile) => {
                                if sent.is_err() {
                                    return;
                                }
                                counters.queued.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn worker(
    id: usize,
    service: Arc<TileService>,
    receiver: Arc<Mutex<mpsc::Receiver<Tile>>>,
    counters: Arc<Counters>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(tile) = next else {
            break;
        };

        if !service.registry().is_prefetchable(&tile.provider) {
            debug!(worker = id, tile = %tile, "Provider not prefetchable, skipping");
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        match service.prefetch_tile(&tile).await {
            Ok(()) => {
                counters.fetched.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(worker = id, tile = %tile, error = %e, "Prefetch failed");
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
