//! Application bootstrap implementation.
//!
//! `TileProxyApp` builds every component exactly once, in dependency order,
//! and hands out shared handles. Nothing is looked up from global state.

use std::sync::Arc;

use tracing::{info, warn};

use super::config::AppConfig;
use super::error::AppError;
use crate::cache::TileCache;
use crate::provider::{init_placeholder, AsyncReqwestClient, ProviderRegistry};
use crate::service::TileService;
use crate::telemetry::Measurements;

/// A running tile proxy.
///
/// Startup order:
/// 1. Placeholder tile (fails fast if PNG encoding is broken)
/// 2. Shared HTTP client
/// 3. Provider registry (archives are opened here)
/// 4. Tile cache (starts its maintenance daemon when active)
/// 5. Tile service (starts the cache-fill writer)
///
/// # Example
///
/// ```ignore
/// use tileproxy::app::{AppConfig, TileProxyApp};
///
/// let app = TileProxyApp::start(AppConfig::from_config_file(&file)).await?;
/// let body = app.service().fetch_tile(&tile).await?;
/// app.shutdown().await;
/// ```
pub struct TileProxyApp {
    service: Arc<TileService>,
    config: AppConfig,
}

impl TileProxyApp {
    /// Starts the application. Must be called from within a Tokio runtime.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        init_placeholder().map_err(|e| AppError::Placeholder(e.to_string()))?;

        let client = Arc::new(AsyncReqwestClient::new().map_err(AppError::HttpClient)?);
        let registry = ProviderRegistry::build(
            config.providers.clone(),
            client,
            &config.prefetch.blacklist,
        )?;
        if registry.is_empty() {
            return Err(AppError::Config("no providers configured".to_string()));
        }

        let cache = TileCache::open(config.cache.clone()).await?;
        let measurements = Measurements::new(config.telemetry);

        let service = TileService::with_fill_settings(
            Arc::new(registry),
            Arc::new(cache),
            Arc::new(measurements),
            config.fill,
        );

        info!(
            providers = ?service.registry().names(),
            cache_active = service.cache().is_active(),
            cache_path = %config.cache.path.display(),
            "Tile proxy started"
        );

        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }

    /// The resolution pipeline.
    pub fn service(&self) -> Arc<TileService> {
        Arc::clone(&self.service)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Drains pending cache writes, then closes the cache.
    pub async fn shutdown(&self) {
        self.service.shutdown().await;
        if let Err(e) = self.service.cache().close().await {
            warn!(error = %e, "Failed to close tile cache");
        }
        info!("Tile proxy stopped");
    }
}
