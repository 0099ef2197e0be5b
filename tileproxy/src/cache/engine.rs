//! The tile cache.
//!
//! [`TileCache`] maps tile identities to content-addressed blobs:
//!
//! ```text
//! Tile ──IndexKey──► SqliteIndex ──IndexEntry{hash}──► BlobStore/{hash}.png
//! ```
//!
//! Index failures never surface as errors from lookups; they are logged and
//! reported as misses so the caller falls through to the upstream provider.

use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::body::{BodySource, TileBody};
use crate::cache::blob::{BlobStats, BlobStore};
use crate::cache::config::CacheConfig;
use crate::cache::error::CacheError;
use crate::cache::index::SqliteIndex;
use crate::cache::key::{hex_digest, IndexEntry, IndexKey};
use crate::cache::maintenance::{self, MaintenanceDaemon, MaintenanceReport, MaintenanceSettings};
use crate::coord::Tile;

/// Cache contents summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Blob files on disk
    pub blob_count: u64,
    /// Total size of blob files
    pub total_bytes: u64,
    /// Entries in the index
    pub index_entries: u64,
}

impl From<BlobStats> for CacheStats {
    fn from(stats: BlobStats) -> Self {
        Self {
            blob_count: stats.blob_count,
            total_bytes: stats.total_bytes,
            index_entries: 0,
        }
    }
}

/// Content-addressed, deduplicating tile cache.
pub struct TileCache {
    config: CacheConfig,
    blobs: Arc<BlobStore>,
    index: Option<Arc<SqliteIndex>>,
    daemon: Mutex<Option<MaintenanceDaemon>>,
}

impl TileCache {
    /// Opens the cache.
    ///
    /// An inactive cache touches nothing on disk and behaves as always
    /// empty. An active cache creates its directories, opens the index and
    /// starts the maintenance daemon.
    pub async fn open(config: CacheConfig) -> Result<Self, CacheError> {
        let blobs = Arc::new(BlobStore::new(config.tiles_dir(), config.tmp_dir()));

        if !config.active {
            info!("Tile cache disabled");
            return Ok(Self {
                config,
                blobs,
                index: None,
                daemon: Mutex::new(None),
            });
        }

        blobs.init().await?;
        let index_path = config.index_path();
        let index = tokio::task::spawn_blocking(move || SqliteIndex::open(&index_path)).await??;
        let index = Arc::new(index);

        let daemon = MaintenanceDaemon::start(
            Arc::clone(&blobs),
            Arc::clone(&index),
            MaintenanceSettings {
                interval: config.maintenance_interval,
                max_age: config.max_age(),
                compaction_ratio: config.compaction_ratio,
            },
        );

        info!(
            path = %config.path.display(),
            max_age_hours = config.max_age_hours,
            "Tile cache opened"
        );

        Ok(Self {
            config,
            blobs,
            index: Some(index),
            daemon: Mutex::new(Some(daemon)),
        })
    }

    /// Whether caching is enabled.
    pub fn is_active(&self) -> bool {
        self.index.is_some()
    }

    /// Configuration the cache was opened with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true if the tile has an index entry whose blob still exists.
    pub async fn has(&self, tile: &Tile) -> bool {
        match self.lookup(tile).await {
            Some(entry) => self.blobs.exists(&entry.hex()).await,
            None => false,
        }
    }

    /// Opens the cached blob for `tile`.
    ///
    /// Blobs older than the configured maximum age are deleted and reported
    /// as a miss.
    pub async fn get(&self, tile: &Tile) -> Option<TileBody> {
        let entry = self.lookup(tile).await?;
        let hex = entry.hex();

        let (file, metadata) = match self.blobs.open(&hex).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                debug!(tile = %tile, hash = %hex, "Indexed blob missing");
                return None;
            }
            Err(e) => {
                warn!(tile = %tile, error = %e, "Failed to open cached blob");
                return None;
            }
        };

        if let Some(max_age) = self.config.max_age() {
            let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let age = SystemTime::now().duration_since(mtime).unwrap_or_default();
            if age > max_age {
                drop(file);
                debug!(tile = %tile, age_secs = age.as_secs(), "Cached blob expired");
                if let Err(e) = self.blobs.remove(&hex).await {
                    warn!(tile = %tile, error = %e, "Failed to remove expired blob");
                }
                return None;
            }
        }

        Some(TileBody::from_reader(file, BodySource::Cache).with_len_hint(metadata.len()))
    }

    /// Stores the payload read from `reader` as the content of `tile`.
    ///
    /// Does nothing when the cache is inactive, or when the tile already has
    /// an entry whose blob exists.
    pub async fn save<R>(&self, tile: &Tile, reader: R) -> Result<(), CacheError>
    where
        R: AsyncRead + Unpin,
    {
        let index = match &self.index {
            Some(index) => Arc::clone(index),
            None => return Ok(()),
        };
        let key = IndexKey::for_tile(tile);

        let existing = {
            let index = Arc::clone(&index);
            let key = key.clone();
            tokio::task::spawn_blocking(move || index.get(&key)).await??
        };
        if let Some(entry) = &existing {
            if self.blobs.exists(&entry.hex()).await {
                return Ok(());
            }
        }

        let staged = self.blobs.stage(reader).await?;
        let hex = hex_digest(&staged.hash);
        let created = self.blobs.commit(&staged, &hex).await?;

        let entry = IndexEntry::now(staged.hash);
        tokio::task::spawn_blocking(move || index.set(&key, &entry)).await??;

        debug!(
            tile = %tile,
            hash = %hex,
            size = staged.size,
            new_blob = created,
            "Tile cached"
        );
        Ok(())
    }

    /// Counts blobs, bytes and index entries.
    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let index = match &self.index {
            Some(index) => Arc::clone(index),
            None => return Ok(CacheStats::default()),
        };
        let blobs = Arc::clone(&self.blobs);

        tokio::task::spawn_blocking(move || -> Result<CacheStats, CacheError> {
            let mut stats = CacheStats::from(blobs.stats_blocking());
            stats.index_entries = index.len()?;
            Ok(stats)
        })
        .await?
    }

    /// Runs one maintenance cycle immediately.
    pub async fn run_maintenance(&self) -> Result<MaintenanceReport, CacheError> {
        match &self.index {
            Some(index) => {
                maintenance::run_cycle(
                    Arc::clone(&self.blobs),
                    Arc::clone(index),
                    self.config.max_age(),
                    self.config.compaction_ratio,
                )
                .await
            }
            None => Ok(MaintenanceReport::default()),
        }
    }

    /// Stops maintenance and flushes the index.
    ///
    /// Calling it more than once is harmless.
    pub async fn close(&self) -> Result<(), CacheError> {
        let daemon = self.daemon.lock().take();
        if let Some(daemon) = daemon {
            daemon.stop().await;
        }

        if let Some(index) = &self.index {
            let index = Arc::clone(index);
            tokio::task::spawn_blocking(move || index.checkpoint()).await??;
            info!("Tile cache closed");
        }
        Ok(())
    }

    async fn lookup(&self, tile: &Tile) -> Option<IndexEntry> {
        let index = Arc::clone(self.index.as_ref()?);
        let key = IndexKey::for_tile(tile);

        match tokio::task::spawn_blocking(move || index.get(&key)).await {
            Ok(Ok(entry)) => entry,
            Ok(Err(e)) => {
                warn!(tile = %tile, error = %e, "Cache index lookup failed");
                None
            }
            Err(e) => {
                warn!(tile = %tile, error = %e, "Cache index task failed");
                None
            }
        }
    }
}
