//! Content-addressed blob tree.
//!
//! # File Layout
//!
//! ```text
//! {root}/tiles/{hex[0..3]}/{hex[3..6]}/{hex}.png
//! {root}/tmp/{pid}-{seq}.tmp
//! ```
//!
//! Incoming payloads are streamed into a temp file while being hashed, then
//! moved to their content address. Identical payloads share one blob.
//!
//! One read/write lock covers every mutation of the tree (mkdir, rename,
//! delete); opening a blob takes the read side so a reader never sees a path
//! that is half moved or just deleted.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::error::CacheError;

/// Extension of blob files.
const BLOB_EXTENSION: &str = "png";

/// Read buffer size used while hashing incoming payloads.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A payload written to scratch space, not yet at its content address.
#[derive(Debug)]
pub struct StagedBlob {
    /// Temp file location
    pub path: PathBuf,
    /// SHA-256 of the payload
    pub hash: [u8; 32],
    /// Payload length in bytes
    pub size: u64,
}

/// Result of one age sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepResult {
    /// Blobs deleted for being too old
    pub blobs_removed: usize,
    /// Bytes freed by those deletions
    pub bytes_freed: u64,
    /// Empty shard directories removed
    pub dirs_pruned: usize,
    /// Wall time of the sweep
    pub duration_ms: u64,
}

/// Blob file count and total size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobStats {
    pub blob_count: u64,
    pub total_bytes: u64,
}

/// The on-disk blob tree.
pub struct BlobStore {
    tiles_dir: PathBuf,
    tmp_dir: PathBuf,
    lock: RwLock<()>,
}

impl BlobStore {
    /// Creates a store over existing or future directories.
    pub fn new(tiles_dir: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            tiles_dir: tiles_dir.into(),
            tmp_dir: tmp_dir.into(),
            lock: RwLock::new(()),
        }
    }

    /// Creates the tree roots and clears temp files left by an interrupted
    /// write.
    pub async fn init(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.tiles_dir).await?;
        fs::create_dir_all(&self.tmp_dir).await?;

        let mut removed = 0usize;
        let mut entries = fs::read_dir(&self.tmp_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("tmp") {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove stale temp file"
                ),
            }
        }
        if removed > 0 {
            debug!(removed, "Removed stale cache temp files");
        }
        Ok(())
    }

    /// Shard directory for a hex digest.
    pub fn shard_dir(&self, hex: &str) -> PathBuf {
        self.tiles_dir.join(&hex[0..3]).join(&hex[3..6])
    }

    /// Final location of a blob.
    pub fn blob_path(&self, hex: &str) -> PathBuf {
        self.shard_dir(hex).join(format!("{}.{}", hex, BLOB_EXTENSION))
    }

    /// Returns true if the blob exists.
    pub async fn exists(&self, hex: &str) -> bool {
        let _guard = self.lock.read().await;
        fs::try_exists(self.blob_path(hex)).await.unwrap_or(false)
    }

    /// Opens a blob for reading, with its metadata.
    ///
    /// Returns `Ok(None)` when the blob is missing.
    pub async fn open(&self, hex: &str) -> Result<Option<(File, std::fs::Metadata)>, CacheError> {
        let _guard = self.lock.read().await;
        let path = self.blob_path(hex);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        Ok(Some((file, metadata)))
    }

    /// Deletes a blob. Missing blobs are not an error.
    pub async fn remove(&self, hex: &str) -> Result<(), CacheError> {
        let _guard = self.lock.write().await;
        match fs::remove_file(self.blob_path(hex)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Streams `reader` into a temp file while hashing it.
    pub async fn stage<R>(&self, mut reader: R) -> Result<StagedBlob, CacheError>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.tmp_dir.join(format!(
            "{}-{}.tmp",
            std::process::id(),
            TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));

        match Self::copy_hashed(&mut reader, &path).await {
            Ok((hash, size)) => Ok(StagedBlob { path, hash, size }),
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    async fn copy_hashed<R>(reader: &mut R, path: &Path) -> Result<([u8; 32], u64), CacheError>
    where
        R: AsyncRead + Unpin,
    {
        let mut file = File::create(path).await?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut size = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
            file.write_all(&buffer[..n]).await?;
            size += n as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        Ok((hasher.finalize().into(), size))
    }

    /// Moves a staged payload to its content address.
    ///
    /// The temp file is always consumed. Returns true if a new blob was
    /// created, false if one with the same content already existed.
    pub async fn commit(&self, staged: &StagedBlob, hex: &str) -> Result<bool, CacheError> {
        let target = self.blob_path(hex);
        let _guard = self.lock.write().await;

        if fs::try_exists(&target).await.unwrap_or(false) {
            let _ = fs::remove_file(&staged.path).await;
            return Ok(false);
        }

        fs::create_dir_all(self.shard_dir(hex)).await?;
        if let Err(e) = fs::rename(&staged.path, &target).await {
            // Cross-device moves fail with EXDEV; copy instead
            debug!(error = %e, "Rename failed, copying blob into place");
            let copied = fs::copy(&staged.path, &target).await;
            let _ = fs::remove_file(&staged.path).await;
            if let Err(e) = copied {
                let _ = fs::remove_file(&target).await;
                return Err(e.into());
            }
        }
        Ok(true)
    }

    /// Deletes blobs whose mtime is older than `max_age`, then prunes empty
    /// shard directories.
    ///
    /// Blocks; run on the blocking pool.
    pub fn sweep_blocking(&self, max_age: Duration) -> SweepResult {
        let start = Instant::now();
        let now = SystemTime::now();
        let mut result = SweepResult::default();

        for (path, mtime, size) in collect_files(&self.tiles_dir) {
            let age = now.duration_since(mtime).unwrap_or_default();
            if age <= max_age {
                continue;
            }
            let _guard = self.lock.blocking_write();
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed expired blob");
                    result.blobs_removed += 1;
                    result.bytes_freed += size;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove expired blob");
                }
            }
        }

        {
            let _guard = self.lock.blocking_write();
            result.dirs_pruned = prune_empty_dirs(&self.tiles_dir);
        }
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Counts blobs and their total size.
    ///
    /// Blocks; run on the blocking pool.
    pub fn stats_blocking(&self) -> BlobStats {
        collect_files(&self.tiles_dir)
            .into_iter()
            .fold(BlobStats::default(), |mut stats, (_, _, size)| {
                stats.blob_count += 1;
                stats.total_bytes += size;
                stats
            })
    }
}

/// Collects every regular file under `dir` with its mtime and size.
fn collect_files(dir: &Path) -> Vec<(PathBuf, SystemTime, u64)> {
    let mut files = Vec::new();
    collect_files_recursive(dir, &mut files);
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<(PathBuf, SystemTime, u64)>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(dir = %dir.display(), error = %e, "Failed to read cache directory");
            }
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_dir() {
            collect_files_recursive(&path, files);
        } else if metadata.is_file() {
            let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((path, mtime, metadata.len()));
        }
    }
}

/// Removes empty directories below `dir` (not `dir` itself).
fn prune_empty_dirs(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut pruned = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            pruned += prune_empty_dirs(&path);
            // Fails harmlessly when the directory still has files
            if std::fs::remove_dir(&path).is_ok() {
                pruned += 1;
            }
        }
    }
    pruned
}
