//! MBTiles archive provider.
//!
//! An archive is a SQLite file holding a `metadata` key/value table and a
//! `tiles(zoom_level, tile_column, tile_row, tile_data)` table whose rows use
//! the TMS convention. The file is opened once at startup and read on the
//! blocking pool.
//!
//! # Fallback
//!
//! When a tile is outside the archive's declared zoom range or bounds, or the
//! archive simply has no data for it, the request is handed to the configured
//! fallback provider with the tile's provider name rewritten. Without a usable
//! fallback the transparent placeholder is served, so an archive never turns a
//! missing tile into a client-visible error.
//!
//! A fallback that cannot be resolved (unknown name, or a chain deeper than
//! [`MAX_FALLBACK_DEPTH`]) trips the adapter's breaker. With
//! [`FallbackBreaker::Permanent`] the fallback stays disabled for the rest of
//! the process lifetime; with [`FallbackBreaker::Never`] it is retried on
//! every request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use crate::body::TileBody;
use crate::coord::{flip_y, tile_lonlat_bounds, LonLatBounds, Tile, MAX_ZOOM};
use crate::provider::config::{FallbackBreaker, ProviderDescriptor};
use crate::provider::placeholder::placeholder_tile;
use crate::provider::registry::ProviderRegistry;
use crate::provider::types::ProviderError;

/// Longest fallback chain followed before giving up.
pub const MAX_FALLBACK_DEPTH: usize = 8;

/// Metadata declared by an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveMetadata {
    pub name: Option<String>,
    pub format: Option<String>,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub bounds: LonLatBounds,
}

/// Provider backed by a local MBTiles file.
pub struct ArchiveProvider {
    name: String,
    conn: Arc<Mutex<Connection>>,
    metadata: ArchiveMetadata,
    fallback: Option<String>,
    breaker: FallbackBreaker,
    fallback_tripped: AtomicBool,
}

impl ArchiveProvider {
    /// Opens the archive named by `descriptor.path` and reads its metadata.
    pub fn open(descriptor: &ProviderDescriptor) -> Result<Self, ProviderError> {
        let path = descriptor.path.clone().ok_or_else(|| {
            ProviderError::Archive(format!("provider '{}' has no archive path", descriptor.name))
        })?;

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ProviderError::Archive(format!("{}: {}", path.display(), e)))?;

        let metadata = read_metadata(&conn)?;

        info!(
            provider = %descriptor.name,
            path = %path.display(),
            min_zoom = metadata.min_zoom,
            max_zoom = metadata.max_zoom,
            fallback = descriptor.fallback.as_deref().unwrap_or("-"),
            "Opened tile archive"
        );

        Ok(Self {
            name: descriptor.name.clone(),
            conn: Arc::new(Mutex::new(conn)),
            metadata,
            fallback: descriptor.fallback.clone(),
            breaker: descriptor.fallback_breaker,
            fallback_tripped: AtomicBool::new(false),
        })
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata read at open time.
    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// Returns the fallback provider if one is configured and not tripped.
    pub fn active_fallback(&self) -> Option<&str> {
        if self.fallback_tripped.load(Ordering::Acquire) {
            return None;
        }
        self.fallback.as_deref()
    }

    /// Returns true once a permanent breaker has disabled the fallback.
    pub fn is_fallback_tripped(&self) -> bool {
        self.fallback_tripped.load(Ordering::Acquire)
    }

    /// Checks the tile against the declared zoom range and bounds.
    pub fn check_range(&self, tile: &Tile) -> Result<(), ProviderError> {
        let meta = &self.metadata;
        if tile.z < meta.min_zoom || tile.z > meta.max_zoom {
            return Err(ProviderError::OutOfRange {
                tile: tile.to_string(),
                reason: format!(
                    "zoom {} outside [{}, {}]",
                    tile.z, meta.min_zoom, meta.max_zoom
                ),
            });
        }
        if !tile_lonlat_bounds(tile.z, tile.x, tile.y).intersects(&meta.bounds) {
            return Err(ProviderError::OutOfRange {
                tile: tile.to_string(),
                reason: "outside archive bounds".to_string(),
            });
        }
        Ok(())
    }

    /// Reads the stored bytes for an XYZ-addressed tile.
    ///
    /// Returns `None` when the archive has no row, or an empty row, for it.
    pub async fn read_tile(&self, tile: &Tile) -> Result<Option<Bytes>, ProviderError> {
        let conn = Arc::clone(&self.conn);
        let (z, x, row) = (tile.z, tile.x, flip_y(tile.y, tile.z));

        let data = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, ProviderError> {
            let conn = conn.lock();
            let data = conn
                .query_row(
                    "SELECT tile_data FROM tiles \
                     WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                    (z as i64, x as i64, row as i64),
                    |r| r.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(data)
        })
        .await
        .map_err(|e| ProviderError::Archive(format!("archive read task failed: {}", e)))??;

        Ok(data.filter(|d| !d.is_empty()).map(Bytes::from))
    }

    /// Fetches a tile, following the fallback chain when the archive cannot
    /// serve it.
    ///
    /// `depth` counts the fallback hops already taken to reach this archive.
    pub async fn fetch(
        &self,
        tile: &Tile,
        registry: &ProviderRegistry,
        depth: usize,
    ) -> Result<TileBody, ProviderError> {
        match self.check_range(tile) {
            Ok(()) => {
                if let Some(data) = self.read_tile(tile).await? {
                    return Ok(TileBody::from_bytes(data));
                }
                debug!(provider = %self.name, tile = %tile, "Tile not in archive");
            }
            Err(e) => {
                debug!(provider = %self.name, error = %e, "Tile rejected by archive");
            }
        }

        let fallback = match self.active_fallback() {
            Some(name) => name,
            None => return Ok(placeholder_body()),
        };

        if depth + 1 > MAX_FALLBACK_DEPTH {
            self.trip(fallback, "fallback chain too deep");
            return Ok(placeholder_body());
        }

        if let Err(e) = registry.resolve(fallback) {
            self.trip(fallback, &e.to_string());
            return Ok(placeholder_body());
        }

        let rewritten = tile.with_provider(fallback);
        match registry.fetch_at_depth(&rewritten, depth + 1).await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!(
                    provider = %self.name,
                    fallback = fallback,
                    tile = %tile,
                    error = %e,
                    "Fallback fetch failed, serving placeholder"
                );
                Ok(placeholder_body())
            }
        }
    }

    fn trip(&self, fallback: &str, reason: &str) {
        match self.breaker {
            FallbackBreaker::Permanent => {
                self.fallback_tripped.store(true, Ordering::Release);
                warn!(
                    provider = %self.name,
                    fallback = fallback,
                    reason = reason,
                    "Fallback disabled"
                );
            }
            FallbackBreaker::Never => {
                warn!(
                    provider = %self.name,
                    fallback = fallback,
                    reason = reason,
                    "Fallback could not be resolved"
                );
            }
        }
    }
}

fn placeholder_body() -> TileBody {
    TileBody::from_bytes(placeholder_tile())
}

fn read_metadata(conn: &Connection) -> Result<ArchiveMetadata, ProviderError> {
    let mut stmt = conn.prepare("SELECT name, value FROM metadata")?;
    let values: HashMap<String, String> = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<_, _>>()?;

    let declared_min = values.get("minzoom").and_then(|v| v.trim().parse::<u8>().ok());
    let declared_max = values.get("maxzoom").and_then(|v| v.trim().parse::<u8>().ok());

    let (min_zoom, max_zoom) = match (declared_min, declared_max) {
        (Some(min), Some(max)) => (min, max),
        _ => {
            let (found_min, found_max): (Option<i64>, Option<i64>) = conn.query_row(
                "SELECT MIN(zoom_level), MAX(zoom_level) FROM tiles",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            (
                declared_min
                    .or_else(|| found_min.map(clamp_zoom))
                    .unwrap_or(0),
                declared_max
                    .or_else(|| found_max.map(clamp_zoom))
                    .unwrap_or(MAX_ZOOM),
            )
        }
    };

    let bounds = match values.get("bounds") {
        Some(raw) => parse_bounds(raw).unwrap_or_else(|| {
            warn!(bounds = %raw, "Unparseable archive bounds, assuming whole world");
            LonLatBounds::WORLD
        }),
        None => LonLatBounds::WORLD,
    };

    Ok(ArchiveMetadata {
        name: values.get("name").cloned(),
        format: values.get("format").cloned(),
        min_zoom,
        max_zoom,
        bounds,
    })
}

fn clamp_zoom(z: i64) -> u8 {
    z.clamp(0, MAX_ZOOM as i64) as u8
}

/// Parses MBTiles `bounds` ("west,south,east,north").
fn parse_bounds(raw: &str) -> Option<LonLatBounds> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [west, south, east, north] => Some(LonLatBounds {
            west: *west,
            south: *south,
            east: *east,
            north: *north,
        }),
        _ => None,
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::provider::config::ProviderKind;
    use crate::provider::http::tests::MockHttpClient;
    use std::path::Path;
    use tempfile::TempDir;

    /// Writes an MBTiles file. Tiles are given in XYZ rows and stored flipped.
    ///
    /// `tests/common/mod.rs` carries a copy for the integration tests; keep
    /// the schemas identical.
    pub fn create_mbtiles(
        path: &Path,
        metadata: &[(&str, &str)],
        tiles: &[(u8, u32, u32, &[u8])],
    ) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE metadata (name TEXT, value TEXT);
             CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER,
                                 tile_row INTEGER, tile_data BLOB);
             CREATE UNIQUE INDEX tile_index ON tiles (zoom_level, tile_column, tile_row);",
        )
        .unwrap();
        for (name, value) in metadata {
            conn.execute(
                "INSERT INTO metadata (name, value) VALUES (?1, ?2)",
                (name, value),
            )
            .unwrap();
        }
        for (z, x, y, data) in tiles {
            conn.execute(
                "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data)
                 VALUES (?1, ?2, ?3, ?4)",
                (*z as i64, *x as i64, flip_y(*y, *z) as i64, data.to_vec()),
            )
            .unwrap();
        }
    }

    fn open(dir: &TempDir, metadata: &[(&str, &str)], tiles: &[(u8, u32, u32, &[u8])]) -> ArchiveProvider {
        let path = dir.path().join("test.mbtiles");
        create_mbtiles(&path, metadata, tiles);
        let d = ProviderDescriptor::new("sea", ProviderKind::Archive).with_path(path);
        ArchiveProvider::open(&d).unwrap()
    }

    fn empty_registry() -> ProviderRegistry {
        ProviderRegistry::build(Vec::new(), Arc::new(MockHttpClient::ok(vec![])), &[]).unwrap()
    }

    #[test]
    fn test_open_reads_metadata() {
        let dir = TempDir::new().unwrap();
        let archive = open(
            &dir,
            &[
                ("name", "Sea charts"),
                ("format", "png"),
                ("minzoom", "2"),
                ("maxzoom", "9"),
                ("bounds", "5.0, 53.0, 15.0, 56.0"),
            ],
            &[],
        );

        let meta = archive.metadata();
        assert_eq!(meta.name.as_deref(), Some("Sea charts"));
        assert_eq!(meta.format.as_deref(), Some("png"));
        assert_eq!((meta.min_zoom, meta.max_zoom), (2, 9));
        assert_eq!(meta.bounds.west, 5.0);
        assert_eq!(meta.bounds.north, 56.0);
    }

    #[test]
    fn test_missing_zoom_range_derived_from_tiles() {
        let dir = TempDir::new().unwrap();
        let archive = open(&dir, &[], &[(3, 0, 0, b"a"), (5, 1, 1, b"b")]);

        assert_eq!(archive.metadata().min_zoom, 3);
        assert_eq!(archive.metadata().max_zoom, 5);
        assert_eq!(archive.metadata().bounds, LonLatBounds::WORLD);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let d = ProviderDescriptor::new("sea", ProviderKind::Archive)
            .with_path(dir.path().join("absent.mbtiles"));
        assert!(matches!(
            ArchiveProvider::open(&d),
            Err(ProviderError::Archive(_))
        ));
    }

    #[test]
    fn test_open_without_path_fails() {
        let d = ProviderDescriptor::new("sea", ProviderKind::Archive);
        assert!(ArchiveProvider::open(&d).is_err());
    }

    #[test]
    fn test_check_range_rejects_zoom_and_bounds() {
        let dir = TempDir::new().unwrap();
        let archive = open(
            &dir,
            &[("minzoom", "2"), ("maxzoom", "4"), ("bounds", "0,0,10,10")],
            &[],
        );

        assert!(matches!(
            archive.check_range(&Tile::new("sea", 1, 0, 0)),
            Err(ProviderError::OutOfRange { .. })
        ));
        assert!(archive.check_range(&Tile::new("sea", 5, 16, 15)).is_err());
        // z=2 tile (2,1) covers lon 0..90, lat 0..66.5
        assert!(archive.check_range(&Tile::new("sea", 2, 2, 1)).is_ok());
        // z=2 tile (0,0) covers lon -180..-90
        assert!(archive.check_range(&Tile::new("sea", 2, 0, 0)).is_err());
    }

    #[test]
    fn test_parse_bounds() {
        let b = parse_bounds("-10.5,20,30,40.25").unwrap();
        assert_eq!((b.west, b.south, b.east, b.north), (-10.5, 20.0, 30.0, 40.25));
        assert!(parse_bounds("1,2,3").is_none());
        assert!(parse_bounds("a,b,c,d").is_none());
    }

    #[tokio::test]
    async fn test_read_tile_applies_row_flip() {
        let dir = TempDir::new().unwrap();
        let archive = open(&dir, &[], &[(1, 0, 0, b"north-west")]);

        let data = archive.read_tile(&Tile::new("sea", 1, 0, 0)).await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"north-west"[..]));

        let missing = archive.read_tile(&Tile::new("sea", 1, 0, 1)).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_empty_row_counts_as_missing() {
        let dir = TempDir::new().unwrap();
        let archive = open(&dir, &[], &[(0, 0, 0, b"")]);

        assert!(archive
            .read_tile(&Tile::new("sea", 0, 0, 0))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_fetch_without_fallback_serves_placeholder() {
        let dir = TempDir::new().unwrap();
        let archive = open(&dir, &[("minzoom", "2"), ("maxzoom", "4")], &[]);
        let registry = empty_registry();

        let body = archive
            .fetch(&Tile::new("sea", 0, 0, 0), &registry, 0)
            .await
            .unwrap();
        assert_eq!(body.into_bytes().await.unwrap(), placeholder_tile());
    }

    #[tokio::test]
    async fn test_fetch_serves_stored_tile() {
        let dir = TempDir::new().unwrap();
        let archive = open(&dir, &[], &[(2, 1, 2, b"stored")]);
        let registry = empty_registry();

        let body = archive
            .fetch(&Tile::new("sea", 2, 1, 2), &registry, 0)
            .await
            .unwrap();
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), b"stored");
    }
}
