//! Content-addressed tile cache
//!
//! Tiles are stored once per distinct payload: the blob tree is keyed by the
//! SHA-256 of the content, and a SQLite index maps each tile identity to the
//! hash of its blob. Two tiles with byte-identical images share one file.
//!
//! # Layout
//!
//! ```text
//! {root}/tiles/{hex[0..3]}/{hex[3..6]}/{hex}.png   blobs
//! {root}/index/index.sqlite3                       tile → hash index
//! {root}/tmp/                                      in-flight writes
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tileproxy::cache::{CacheConfig, TileCache};
//!
//! let cache = TileCache::open(CacheConfig::new("./cache").with_max_age_hours(168)).await?;
//! cache.save(&tile, &bytes[..]).await?;
//! let body = cache.get(&tile).await;
//! cache.close().await?;
//! ```

mod blob;
mod config;
mod engine;
mod error;
mod index;
mod key;
mod maintenance;

pub use blob::{BlobStats, BlobStore, StagedBlob, SweepResult};
pub use config::{
    default_cache_dir, CacheConfig, DEFAULT_COMPACTION_RATIO, DEFAULT_MAINTENANCE_INTERVAL,
};
pub use engine::{CacheStats, TileCache};
pub use error::CacheError;
pub use index::SqliteIndex;
pub use key::{hex_digest, IndexEntry, IndexKey};
pub use maintenance::{run_cycle, MaintenanceDaemon, MaintenanceReport, MaintenanceSettings};
