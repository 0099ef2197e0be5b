//! Upstream tile providers
//!
//! Every provider answers the same question: "give me the bytes of this
//! tile". Three kinds exist:
//!
//! - [`WmsProvider`]: OGC Web Map Service, queried by Web Mercator bbox
//! - [`TileServerProvider`]: TMS or XYZ tile servers, `{base}/{z}/{x}/{y}.png`
//! - [`ArchiveProvider`]: local MBTiles files with fallback chaining
//!
//! The [`ProviderRegistry`] builds one adapter per configured
//! [`ProviderDescriptor`] and dispatches fetches by provider name.
//!
//! ```ignore
//! use std::sync::Arc;
//! use tileproxy::provider::{AsyncReqwestClient, ProviderRegistry};
//!
//! let client = Arc::new(AsyncReqwestClient::new()?);
//! let registry = ProviderRegistry::build(descriptors, client, &[])?;
//! let body = registry.fetch(&tile).await?;
//! ```

mod archive;
mod config;
mod http;
mod placeholder;
mod registry;
mod tms;
mod types;
mod wms;

pub use archive::{ArchiveMetadata, ArchiveProvider, MAX_FALLBACK_DEPTH};
pub use config::{
    is_blacklisted, FallbackBreaker, ProviderDescriptor, ProviderKind, UnknownProviderKind,
    DEFAULT_PREFETCH_BLACKLIST, DEFAULT_WMS_FORMAT, DEFAULT_WMS_VERSION,
};
pub use http::{
    AsyncHttpClient, AsyncReqwestClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_USER_AGENT,
};
pub use placeholder::{generate_transparent_png, init_placeholder, placeholder_tile, PLACEHOLDER_SIZE};
pub use registry::{ProviderAdapter, ProviderRegistry, RegistryError};
pub use tms::{RowOrigin, TileServerProvider};
pub use types::{BoxFuture, ProviderError};
pub use wms::WmsProvider;

#[cfg(test)]
pub use archive::tests::create_mbtiles;
#[cfg(test)]
pub use http::tests::MockHttpClient;
