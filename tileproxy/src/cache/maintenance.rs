//! Background cache maintenance.
//!
//! The daemon wakes once per interval and runs two independent jobs:
//!
//! - **Age sweep**: deletes blobs whose mtime exceeds the maximum age and
//!   prunes the shard directories left empty. The index is not touched;
//!   entries pointing at swept blobs turn into ordinary misses on the next
//!   read.
//! - **Index compaction**: reclaims free pages in the index database once
//!   they make up the configured share of the file.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::blob::{BlobStore, SweepResult};
use crate::cache::error::CacheError;
use crate::cache::index::SqliteIndex;

/// Outcome of one maintenance cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Age sweep result; `None` when age checks are disabled
    pub sweep: Option<SweepResult>,
    /// Whether the index was compacted
    pub index_compacted: bool,
}

impl fmt::Display for MaintenanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sweep {
            Some(sweep) => write!(
                f,
                "removed {} blobs ({} bytes), pruned {} dirs in {}ms",
                sweep.blobs_removed, sweep.bytes_freed, sweep.dirs_pruned, sweep.duration_ms
            )?,
            None => write!(f, "age sweep disabled")?,
        }
        write!(
            f,
            ", index {}",
            if self.index_compacted {
                "compacted"
            } else {
                "unchanged"
            }
        )
    }
}

/// Settings for the maintenance jobs.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceSettings {
    pub interval: Duration,
    pub max_age: Option<Duration>,
    pub compaction_ratio: f64,
}

/// Runs one maintenance cycle on the blocking pool.
pub async fn run_cycle(
    blobs: Arc<BlobStore>,
    index: Arc<SqliteIndex>,
    max_age: Option<Duration>,
    compaction_ratio: f64,
) -> Result<MaintenanceReport, CacheError> {
    let sweep = match max_age {
        Some(max_age) => {
            Some(tokio::task::spawn_blocking(move || blobs.sweep_blocking(max_age)).await?)
        }
        None => None,
    };

    let compacted = tokio::task::spawn_blocking(move || index.compact(compaction_ratio)).await?;
    let index_compacted = match compacted {
        Ok(compacted) => compacted,
        Err(e) => {
            warn!(error = %e, "Cache index compaction failed");
            false
        }
    };

    Ok(MaintenanceReport {
        sweep,
        index_compacted,
    })
}

/// Handle to the running maintenance task.
pub struct MaintenanceDaemon {
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MaintenanceDaemon {
    /// Spawns the maintenance loop. The first cycle runs after one interval.
    pub fn start(
        blobs: Arc<BlobStore>,
        index: Arc<SqliteIndex>,
        settings: MaintenanceSettings,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let handle = tokio::spawn(async move {
            info!(
                interval_secs = settings.interval.as_secs(),
                max_age_secs = settings.max_age.map(|d| d.as_secs()).unwrap_or(0),
                "Cache maintenance daemon started"
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Cache maintenance daemon shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(settings.interval) => {
                        match run_cycle(
                            Arc::clone(&blobs),
                            Arc::clone(&index),
                            settings.max_age,
                            settings.compaction_ratio,
                        )
                        .await
                        {
                            Ok(report) => info!(report = %report, "Cache maintenance complete"),
                            Err(e) => warn!(error = %e, "Cache maintenance failed"),
                        }
                    }
                }
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Signals the loop to stop and waits for an in-progress cycle.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Returns true until [`stop`](Self::stop) has been requested.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }
}

impl Drop for MaintenanceDaemon {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
