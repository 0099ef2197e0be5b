//! Cache configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default interval between maintenance cycles.
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default free-page ratio above which the index is compacted.
pub const DEFAULT_COMPACTION_RATIO: f64 = 0.5;

/// Directory under the cache root holding content-addressed blobs.
pub const TILES_DIR: &str = "tiles";

/// Directory under the cache root holding the index database.
pub const INDEX_DIR: &str = "index";

/// Index database file name.
pub const INDEX_FILE: &str = "index.sqlite3";

/// Directory under the cache root for in-flight writes.
pub const TMP_DIR: &str = "tmp";

/// Configuration for [`TileCache`](super::TileCache).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Cache root directory
    pub path: PathBuf,
    /// Global on/off switch
    pub active: bool,
    /// Blobs older than this many hours are rejected and swept; 0 disables
    pub max_age_hours: u64,
    /// Interval between maintenance cycles
    pub maintenance_interval: Duration,
    /// Free-page ratio that triggers index compaction
    pub compaction_ratio: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_dir(),
            active: false,
            max_age_hours: 0,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            compaction_ratio: DEFAULT_COMPACTION_RATIO,
        }
    }
}

impl CacheConfig {
    /// Creates an active cache rooted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            active: true,
            ..Self::default()
        }
    }

    /// Enables or disables caching.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Sets the maximum blob age in hours.
    pub fn with_max_age_hours(mut self, hours: u64) -> Self {
        self.max_age_hours = hours;
        self
    }

    /// Sets the maintenance interval.
    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Maximum blob age, or `None` when age checks are disabled.
    pub fn max_age(&self) -> Option<Duration> {
        (self.max_age_hours > 0).then(|| Duration::from_secs(self.max_age_hours * 60 * 60))
    }

    /// Blob tree root.
    pub fn tiles_dir(&self) -> PathBuf {
        self.path.join(TILES_DIR)
    }

    /// Index database location.
    pub fn index_path(&self) -> PathBuf {
        self.path.join(INDEX_DIR).join(INDEX_FILE)
    }

    /// Scratch directory for in-flight writes.
    pub fn tmp_dir(&self) -> PathBuf {
        self.path.join(TMP_DIR)
    }

    /// Cache root.
    pub fn root(&self) -> &Path {
        &self.path
    }
}

/// Platform cache directory for tileproxy, falling back to `./cache`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("tileproxy"))
        .unwrap_or_else(|| PathBuf::from("cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_inactive() {
        let config = CacheConfig::default();
        assert!(!config.active);
        assert_eq!(config.max_age_hours, 0);
        assert_eq!(config.max_age(), None);
        assert_eq!(config.maintenance_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_layout() {
        let config = CacheConfig::new("/var/cache/tiles").with_max_age_hours(2);
        assert!(config.active);
        assert_eq!(config.max_age(), Some(Duration::from_secs(7200)));
        assert_eq!(config.tiles_dir(), PathBuf::from("/var/cache/tiles/tiles"));
        assert_eq!(
            config.index_path(),
            PathBuf::from("/var/cache/tiles/index/index.sqlite3")
        );
        assert_eq!(config.tmp_dir(), PathBuf::from("/var/cache/tiles/tmp"));
    }
}
