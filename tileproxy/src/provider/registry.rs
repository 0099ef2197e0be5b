//! Provider registry.
//!
//! Built once at startup from the configured descriptors. Each descriptor is
//! turned into exactly one [`ProviderAdapter`]; the adapter kind is fixed at
//! build time so request handling is a plain `match`.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tracing::{info, warn};

use crate::body::TileBody;
use crate::coord::Tile;
use crate::provider::archive::ArchiveProvider;
use crate::provider::config::{
    is_blacklisted, ProviderDescriptor, ProviderKind, DEFAULT_PREFETCH_BLACKLIST,
};
use crate::provider::http::AsyncHttpClient;
use crate::provider::tms::{RowOrigin, TileServerProvider};
use crate::provider::types::{BoxFuture, ProviderError};
use crate::provider::wms::WmsProvider;

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Provider '{0}' is configured more than once")]
    Duplicate(String),

    #[error("Provider '{provider}' has an invalid URL '{url}': {reason}")]
    InvalidUrl {
        provider: String,
        url: String,
        reason: String,
    },

    #[error("Failed to open archive for provider '{provider}': {source}")]
    Archive {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// A constructed provider of one of the supported kinds.
pub enum ProviderAdapter {
    Wms(WmsProvider),
    TileServer(TileServerProvider),
    Archive(ArchiveProvider),
}

impl ProviderAdapter {
    /// Name the adapter was registered under.
    pub fn name(&self) -> &str {
        match self {
            ProviderAdapter::Wms(p) => p.name(),
            ProviderAdapter::TileServer(p) => p.name(),
            ProviderAdapter::Archive(p) => p.name(),
        }
    }
}

struct RegistryEntry {
    descriptor: ProviderDescriptor,
    adapter: ProviderAdapter,
}

/// Name → adapter map plus capability flags.
pub struct ProviderRegistry {
    entries: HashMap<String, RegistryEntry>,
    blacklist: Vec<String>,
}

impl ProviderRegistry {
    /// Builds every adapter.
    ///
    /// All HTTP-backed adapters share `http_client`. `extra_blacklist` is
    /// appended to [`DEFAULT_PREFETCH_BLACKLIST`].
    pub fn build(
        descriptors: Vec<ProviderDescriptor>,
        http_client: Arc<dyn AsyncHttpClient>,
        extra_blacklist: &[String],
    ) -> Result<Self, RegistryError> {
        let mut entries = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if entries.contains_key(&descriptor.name) {
                return Err(RegistryError::Duplicate(descriptor.name));
            }

            let adapter = match descriptor.kind {
                ProviderKind::Wms => {
                    let base = parse_url(&descriptor)?;
                    ProviderAdapter::Wms(WmsProvider::new(&descriptor, base, http_client.clone()))
                }
                ProviderKind::Tms | ProviderKind::Xyz => {
                    parse_url(&descriptor)?;
                    let origin = if descriptor.kind == ProviderKind::Tms {
                        RowOrigin::South
                    } else {
                        RowOrigin::North
                    };
                    ProviderAdapter::TileServer(TileServerProvider::new(
                        &descriptor,
                        origin,
                        http_client.clone(),
                    ))
                }
                ProviderKind::Archive => {
                    let archive = ArchiveProvider::open(&descriptor).map_err(|source| {
                        RegistryError::Archive {
                            provider: descriptor.name.clone(),
                            source,
                        }
                    })?;
                    ProviderAdapter::Archive(archive)
                }
            };

            info!(
                provider = %descriptor.name,
                kind = %descriptor.kind,
                cacheable = descriptor.cacheable,
                "Registered provider"
            );
            entries.insert(
                descriptor.name.clone(),
                RegistryEntry {
                    descriptor,
                    adapter,
                },
            );
        }

        for entry in entries.values() {
            if let Some(fallback) = &entry.descriptor.fallback {
                if !entries.contains_key(fallback) {
                    warn!(
                        provider = %entry.descriptor.name,
                        fallback = %fallback,
                        "Fallback provider is not configured"
                    );
                }
            }
        }

        let blacklist = DEFAULT_PREFETCH_BLACKLIST
            .iter()
            .map(|s| s.to_string())
            .chain(
                extra_blacklist
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            )
            .collect();

        Ok(Self { entries, blacklist })
    }

    /// Returns true if a provider is registered under `name`.
    pub fn has_provider(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns true if tiles from `name` may be cached.
    pub fn is_cacheable(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map(|e| e.descriptor.cacheable)
            .unwrap_or(false)
    }

    /// Returns true if the scheduler may bulk-download from `name`.
    ///
    /// Requires a cacheable provider that did not opt out, whose URL matches
    /// no blacklist entry.
    pub fn is_prefetchable(&self, name: &str) -> bool {
        match self.entries.get(name) {
            Some(entry) => {
                let d = &entry.descriptor;
                d.cacheable && d.prefetchable && !is_blacklisted(&d.url, &self.blacklist)
            }
            None => false,
        }
    }

    /// Looks up the adapter registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<&ProviderAdapter, ProviderError> {
        self.entries
            .get(name)
            .map(|e| &e.adapter)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetches `tile` from the provider named in `tile.provider`.
    pub async fn fetch(&self, tile: &Tile) -> Result<TileBody, ProviderError> {
        self.fetch_at_depth(tile, 0).await
    }

    /// Fetches `tile` with `depth` fallback hops already taken.
    pub(crate) fn fetch_at_depth<'a>(
        &'a self,
        tile: &'a Tile,
        depth: usize,
    ) -> BoxFuture<'a, Result<TileBody, ProviderError>> {
        Box::pin(async move {
            match self.resolve(&tile.provider)? {
                ProviderAdapter::Wms(p) => p.fetch(tile).await,
                ProviderAdapter::TileServer(p) => p.fetch(tile).await,
                ProviderAdapter::Archive(p) => p.fetch(tile, self, depth).await,
            }
        })
    }
}

fn parse_url(descriptor: &ProviderDescriptor) -> Result<Url, RegistryError> {
    Url::parse(&descriptor.url).map_err(|e| RegistryError::InvalidUrl {
        provider: descriptor.name.clone(),
        url: descriptor.url.clone(),
        reason: e.to_string(),
    })
}
