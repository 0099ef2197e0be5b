//! Application configuration for `TileProxyApp`.

use crate::cache::CacheConfig;
use crate::config::ConfigFile;
use crate::prefetch::PrefetchConfig;
use crate::provider::ProviderDescriptor;
use crate::service::FillSettings;

/// Everything needed to bootstrap the application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Tile cache settings.
    pub cache: CacheConfig,

    /// Upstream providers.
    pub providers: Vec<ProviderDescriptor>,

    /// Prefetch settings; the blacklist also feeds the registry.
    pub prefetch: PrefetchConfig,

    /// Cache-fill queue sizing.
    pub fill: FillSettings,

    /// Collect timing statistics.
    pub telemetry: bool,
}

impl AppConfig {
    /// Creates a configuration with an inactive cache and default settings.
    pub fn new(providers: Vec<ProviderDescriptor>) -> Self {
        Self {
            cache: CacheConfig::default(),
            providers,
            prefetch: PrefetchConfig::default(),
            fill: FillSettings::default(),
            telemetry: true,
        }
    }

    /// Sets the cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the prefetch configuration.
    pub fn with_prefetch(mut self, prefetch: PrefetchConfig) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Builds the application configuration from a loaded config file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            cache: config.cache.clone(),
            providers: config.providers.clone(),
            prefetch: config.prefetch.clone(),
            fill: FillSettings::default(),
            telemetry: config.server.telemetry,
        }
    }
}
