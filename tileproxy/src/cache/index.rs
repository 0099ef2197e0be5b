//! SQLite-backed key/value index.
//!
//! One table, `kv(key BLOB PRIMARY KEY, value BLOB NOT NULL)`, maps encoded
//! tile identities to [`IndexEntry`] values. The database runs in WAL mode
//! with incremental auto-vacuum so freed pages can be reclaimed by
//! [`SqliteIndex::compact`] without rewriting the whole file.
//!
//! All methods block; async callers go through `spawn_blocking`.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::cache::error::CacheError;
use crate::cache::key::{IndexEntry, IndexKey};

/// Key/value index over a single SQLite connection.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Opens or creates the index at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // auto_vacuum only takes effect before the first table is created
        conn.pragma_update(None, "auto_vacuum", "INCREMENTAL")?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key   BLOB PRIMARY KEY,
                 value BLOB NOT NULL
             ) WITHOUT ROWID;",
        )?;

        debug!(path = %path.display(), journal_mode = %mode, "Cache index opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Looks up the entry stored under `key`.
    pub fn get(&self, key: &IndexKey) -> Result<Option<IndexEntry>, CacheError> {
        let value: Option<Vec<u8>> = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                [key.as_bytes()],
                |row| row.get(0),
            )
            .optional()?;

        value.map(|bytes| IndexEntry::decode(&bytes)).transpose()
    }

    /// Stores `entry` under `key`, replacing any previous value.
    pub fn set(&self, key: &IndexKey, entry: &IndexEntry) -> Result<(), CacheError> {
        let value = entry.encode()?;
        self.conn.lock().execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key.as_bytes(), value),
        )?;
        Ok(())
    }

    /// Returns true if an entry exists under `key`.
    pub fn contains(&self, key: &IndexKey) -> Result<bool, CacheError> {
        let found = self
            .conn
            .lock()
            .query_row(
                "SELECT 1 FROM kv WHERE key = ?1",
                [key.as_bytes()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<u64, CacheError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Reclaims free pages when at least `ratio` of the file is free.
    ///
    /// Returns true if a vacuum ran.
    pub fn compact(&self, ratio: f64) -> Result<bool, CacheError> {
        let conn = self.conn.lock();
        let pages: i64 = conn.pragma_query_value(None, "page_count", |row| row.get(0))?;
        let free: i64 = conn.pragma_query_value(None, "freelist_count", |row| row.get(0))?;

        if pages == 0 || free == 0 || (free as f64 / pages as f64) < ratio {
            debug!(pages, free, ratio, "Cache index compaction not needed");
            return Ok(false);
        }

        // Each step frees one page, so drain the statement fully
        let mut stmt = conn.prepare("PRAGMA incremental_vacuum")?;
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {}

        info!(pages, freed = free, "Cache index compacted");
        Ok(true)
    }

    /// Flushes the write-ahead log into the main database file.
    pub fn checkpoint(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("PRAGMA wal_checkpoint(TRUNCATE)")?;
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {}
        Ok(())
    }
}
