//! Tile resolution pipeline.
//!
//! [`TileService`] is the single entry point used by the HTTP server and the
//! prefetch scheduler:
//!
//! ```text
//! fetch_tile(tile)
//!   ├─ unknown provider / invalid coords ──► TileError
//!   ├─ cacheable? ── cache hit ───────────► body (from disk)
//!   ├─ registry fetch ── error ───────────► TileError::Upstream
//!   └─ cacheable & cache active?
//!        yes ─► buffer, enqueue cache fill ─► body (from memory)
//!        no  ─► body (streamed from upstream)
//! ```

mod error;
mod fill;

pub use error::TileError;
pub use fill::{FillSettings, DEFAULT_FILL_CONCURRENCY, DEFAULT_FILL_QUEUE_CAPACITY};

use std::sync::Arc;

use tracing::debug;

use crate::body::TileBody;
use crate::cache::TileCache;
use crate::coord::Tile;
use crate::provider::ProviderRegistry;
use crate::telemetry::Measurements;

use fill::{save_tile, FillQueue};

/// How a freshly fetched tile reaches the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillMode {
    /// Hand off to the cache-fill queue
    Queue,
    /// Save before returning
    Await,
}

/// Resolves tiles through the cache and the provider registry.
pub struct TileService {
    registry: Arc<ProviderRegistry>,
    cache: Arc<TileCache>,
    measurements: Arc<Measurements>,
    fill: FillQueue,
}

impl TileService {
    /// Creates the service and starts its cache-fill writer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: Arc<TileCache>,
        measurements: Arc<Measurements>,
    ) -> Self {
        Self::with_fill_settings(registry, cache, measurements, FillSettings::default())
    }

    /// Creates the service with explicit cache-fill queue sizing.
    pub fn with_fill_settings(
        registry: Arc<ProviderRegistry>,
        cache: Arc<TileCache>,
        measurements: Arc<Measurements>,
        settings: FillSettings,
    ) -> Self {
        let fill = FillQueue::start(Arc::clone(&cache), Arc::clone(&measurements), settings);
        Self {
            registry,
            cache,
            measurements,
            fill,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    pub fn measurements(&self) -> &Arc<Measurements> {
        &self.measurements
    }

    /// Returns the body of `tile`, serving from cache when possible.
    ///
    /// Fresh upstream tiles are persisted in the background.
    pub async fn fetch_tile(&self, tile: &Tile) -> Result<TileBody, TileError> {
        let mut monitor = self.measurements.monitor("getTile");
        let result = self.resolve(tile, FillMode::Queue).await;
        if result.is_err() {
            monitor.set_error();
        }
        result
    }

    /// Makes sure `tile` is cached, waiting for the cache write.
    pub async fn prefetch_tile(&self, tile: &Tile) -> Result<(), TileError> {
        let mut monitor = self.measurements.monitor("getTile");
        match self.resolve(tile, FillMode::Await).await {
            Ok(_) => Ok(()),
            Err(e) => {
                monitor.set_error();
                Err(e)
            }
        }
    }

    /// Whether `tile` is already cached.
    pub async fn is_cached(&self, tile: &Tile) -> bool {
        self.registry.is_cacheable(&tile.provider) && self.cache.has(tile).await
    }

    /// Stops accepting cache fills and waits for pending writes.
    pub async fn shutdown(&self) {
        self.fill.close().await;
        debug!("Tile service stopped");
    }

    async fn resolve(&self, tile: &Tile, mode: FillMode) -> Result<TileBody, TileError> {
        if !self.registry.has_provider(&tile.provider) {
            return Err(TileError::NotFound(tile.provider.clone()));
        }
        tile.validate().map_err(|source| TileError::InvalidTile {
            tile: tile.clone(),
            source,
        })?;

        let cacheable = self.registry.is_cacheable(&tile.provider);
        if cacheable {
            if let Some(body) = self.from_cache(tile).await {
                return Ok(body);
            }
        }

        let body = self.from_provider(tile).await?;
        if !cacheable || !self.cache.is_active() {
            return Ok(body);
        }

        let bytes = body.into_bytes().await.map_err(|source| TileError::Read {
            tile: tile.clone(),
            source,
        })?;

        match mode {
            FillMode::Queue => {
                self.fill.enqueue(tile.clone(), bytes.clone());
            }
            FillMode::Await => {
                save_tile(&self.cache, &self.measurements, tile, &bytes).await;
            }
        }

        Ok(TileBody::from_bytes(bytes))
    }

    async fn from_cache(&self, tile: &Tile) -> Option<TileBody> {
        let _monitor = self.measurements.monitor("getTileFromCache");
        let body = self.cache.get(tile).await;
        if body.is_some() {
            debug!(tile = %tile, "Cache hit");
        }
        body
    }

    async fn from_provider(&self, tile: &Tile) -> Result<TileBody, TileError> {
        let mut monitor = self.measurements.monitor("getTileFromProvider");
        let mut per_provider = self
            .measurements
            .monitor(&format!("getTileFromProvider:{}", tile.provider));

        self.registry.fetch(tile).await.map_err(|source| {
            monitor.set_error();
            per_provider.set_error();
            TileError::Upstream {
                tile: tile.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodySource;
    use crate::cache::CacheConfig;
    use crate::provider::{MockHttpClient, ProviderDescriptor, ProviderKind};
    use std::time::Duration;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG fake tile payload";

    struct Fixture {
        _dir: TempDir,
        client: Arc<MockHttpClient>,
        service: TileService,
    }

    async fn fixture(client: MockHttpClient, active: bool) -> Fixture {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(client);
        let mut live = ProviderDescriptor::new("live", ProviderKind::Xyz)
            .with_url("https://live.example.com");
        live.cacheable = false;
        let registry = ProviderRegistry::build(
            vec![
                ProviderDescriptor::new("osm", ProviderKind::Xyz)
                    .with_url("https://tiles.example.com"),
                live,
            ],
            client.clone(),
            &[],
        )
        .unwrap();
        let cache = TileCache::open(CacheConfig::new(dir.path()).with_active(active))
            .await
            .unwrap();

        let service = TileService::new(
            Arc::new(registry),
            Arc::new(cache),
            Arc::new(Measurements::new(true)),
        );
        Fixture {
            _dir: dir,
            client,
            service,
        }
    }

    async fn wait_cached(service: &TileService, tile: &Tile) -> bool {
        for _ in 0..100 {
            if service.cache().has(tile).await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected_before_fetch() {
        let f = fixture(MockHttpClient::ok(PNG), true).await;
        let err = f
            .service
            .fetch_tile(&Tile::new("nope", 0, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TileError::NotFound(ref name) if name == "nope"));
        assert_eq!(f.client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_tile_rejected_before_fetch() {
        let f = fixture(MockHttpClient::ok(PNG), true).await;
        let err = f
            .service
            .fetch_tile(&Tile::new("osm", 1, 2, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TileError::InvalidTile { .. }));
        assert_eq!(f.client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let f = fixture(MockHttpClient::ok(PNG), true).await;
        let tile = Tile::new("osm", 3, 2, 1);

        let body = f.service.fetch_tile(&tile).await.unwrap();
        assert_eq!(body.source(), BodySource::Memory);
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), PNG);
        assert!(wait_cached(&f.service, &tile).await);

        let body = f.service.fetch_tile(&tile).await.unwrap();
        assert_eq!(body.source(), BodySource::Cache);
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), PNG);
        assert_eq!(f.client.request_count(), 1);

        let snapshot = f.service.measurements().snapshot();
        assert_eq!(snapshot.point("getTile").unwrap().count, 2);
        assert_eq!(snapshot.point("getTileFromProvider:osm").unwrap().count, 1);
        f.service.shutdown().await;
    }

    #[tokio::test]
    async fn test_non_cacheable_streams_and_never_caches() {
        let f = fixture(MockHttpClient::ok(PNG), true).await;
        let tile = Tile::new("live", 0, 0, 0);

        let body = f.service.fetch_tile(&tile).await.unwrap();
        assert_eq!(body.source(), BodySource::Upstream);
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), PNG);

        f.service.shutdown().await;
        assert!(!f.service.cache().has(&tile).await);
    }

    #[tokio::test]
    async fn test_inactive_cache_streams_upstream() {
        let f = fixture(MockHttpClient::ok(PNG), false).await;
        let tile = Tile::new("osm", 0, 0, 0);

        let body = f.service.fetch_tile(&tile).await.unwrap();
        assert_eq!(body.source(), BodySource::Upstream);
        f.service.fetch_tile(&tile).await.unwrap();
        assert_eq!(f.client.request_count(), 2);
    }

    #[tokio::test]
    async fn test_upstream_error_maps_to_502() {
        let f = fixture(MockHttpClient::status(503), true).await;
        let err = f
            .service
            .fetch_tile(&Tile::new("osm", 0, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TileError::Upstream { .. }));
        assert_eq!(err.status_code(), 502);

        let snapshot = f.service.measurements().snapshot();
        assert_eq!(snapshot.point("getTile").unwrap().errors, 1);
        assert_eq!(snapshot.point("getTileFromProvider").unwrap().errors, 1);
    }

    #[tokio::test]
    async fn test_prefetch_tile_waits_for_cache_write() {
        let f = fixture(MockHttpClient::ok(PNG), true).await;
        let tile = Tile::new("osm", 2, 1, 1);

        f.service.prefetch_tile(&tile).await.unwrap();
        assert!(f.service.cache().has(&tile).await);
        assert!(f.service.is_cached(&tile).await);
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_writes() {
        let f = fixture(MockHttpClient::ok(PNG), true).await;
        let tiles: Vec<Tile> = (0..4).map(|x| Tile::new("osm", 2, x, 0)).collect();
        for tile in &tiles {
            f.service.fetch_tile(tile).await.unwrap();
        }

        f.service.shutdown().await;
        for tile in &tiles {
            assert!(f.service.cache().has(tile).await);
        }
    }

    #[tokio::test]
    async fn test_full_fill_queue_drops_writes() {
        let dir = TempDir::new().unwrap();
        let registry = ProviderRegistry::build(
            vec![ProviderDescriptor::new("osm", ProviderKind::Xyz)
                .with_url("https://tiles.example.com")],
            Arc::new(MockHttpClient::ok(PNG)),
            &[],
        )
        .unwrap();
        let cache = TileCache::open(CacheConfig::new(dir.path())).await.unwrap();
        let service = TileService::with_fill_settings(
            Arc::new(registry),
            Arc::new(cache),
            Arc::new(Measurements::new(true)),
            FillSettings {
                capacity: 1,
                concurrency: 1,
            },
        );

        // The current-thread runtime does not run the writer until we yield
        let first = service.fill.enqueue(Tile::new("osm", 0, 0, 0), PNG.into());
        let second = service.fill.enqueue(Tile::new("osm", 1, 0, 0), PNG.into());
        assert!(first);
        assert!(!second);

        service.shutdown().await;
        assert!(!service.fill.enqueue(Tile::new("osm", 1, 1, 0), PNG.into()));
    }
}
