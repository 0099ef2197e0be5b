//! OGC Web Map Service provider.
//!
//! WMS servers have no notion of tiles; every request asks for an image of a
//! bounding box. The tile's Web Mercator extent is computed with
//! [`tile_bbox`] and a 256×256 `GetMap` request is issued for it.
//!
//! # Query
//!
//! `request=GetMap&service=WMS&layers=..&format=..&bbox=l,b,r,t&width=256&height=256&srs=EPSG:3857&crs=EPSG:3857&version=..&styles=..`
//!
//! Both `srs` (WMS 1.1.x) and `crs` (WMS 1.3.0) are sent. Query parameters
//! already present on the configured URL are kept ahead of these.

use std::sync::Arc;

use reqwest::Url;
use tracing::debug;

use crate::body::TileBody;
use crate::coord::{tile_bbox, BoundingBox, Tile};
use crate::provider::config::ProviderDescriptor;
use crate::provider::http::AsyncHttpClient;
use crate::provider::types::ProviderError;

/// Pixel size of every requested image.
const TILE_PIXELS: &str = "256";

/// Projection requested from the server.
const PROJECTION: &str = "EPSG:3857";

/// Provider backed by a WMS `GetMap` endpoint.
pub struct WmsProvider {
    name: String,
    base: Url,
    layers: String,
    format: String,
    styles: String,
    version: String,
    headers: Vec<(String, String)>,
    http_client: Arc<dyn AsyncHttpClient>,
}

impl WmsProvider {
    /// Creates a WMS provider for an already validated base URL.
    pub fn new(
        descriptor: &ProviderDescriptor,
        base: Url,
        http_client: Arc<dyn AsyncHttpClient>,
    ) -> Self {
        Self {
            name: descriptor.name.clone(),
            base,
            layers: descriptor.layers.clone(),
            format: descriptor.format.clone(),
            styles: descriptor.styles.clone(),
            version: descriptor.version.clone(),
            headers: descriptor.header_pairs(),
            http_client,
        }
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the `GetMap` URL for a bounding box.
    pub fn build_url(&self, bbox: &BoundingBox) -> String {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("request", "GetMap")
            .append_pair("service", "WMS")
            .append_pair("layers", &self.layers)
            .append_pair("format", &self.format)
            .append_pair(
                "bbox",
                &format!(
                    "{:.9},{:.9},{:.9},{:.9}",
                    bbox.left, bbox.bottom, bbox.right, bbox.top
                ),
            )
            .append_pair("width", TILE_PIXELS)
            .append_pair("height", TILE_PIXELS)
            .append_pair("srs", PROJECTION)
            .append_pair("crs", PROJECTION)
            .append_pair("version", &self.version)
            .append_pair("styles", &self.styles);
        url.to_string()
    }

    /// Fetches the image covering `tile`.
    pub async fn fetch(&self, tile: &Tile) -> Result<TileBody, ProviderError> {
        let url = self.build_url(&tile_bbox(tile.z, tile.x, tile.y));
        debug!(provider = %self.name, tile = %tile, url = %url, "Requesting WMS tile");
        self.http_client.get(&url, &self.headers).await
    }
}
