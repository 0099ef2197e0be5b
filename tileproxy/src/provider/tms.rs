//! TMS and XYZ tile server provider.
//!
//! Both conventions use the URL pattern `{base}/{z}/{x}/{y}.png` and differ
//! only in where row 0 sits: XYZ counts from the north edge, TMS from the
//! south edge. Requests arrive in XYZ, so a TMS provider flips the row before
//! building the URL.

use std::sync::Arc;

use tracing::debug;

use crate::body::TileBody;
use crate::coord::{flip_y, Tile};
use crate::provider::config::ProviderDescriptor;
use crate::provider::http::AsyncHttpClient;
use crate::provider::types::ProviderError;

/// Row convention of a tile server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrigin {
    /// Row 0 at the north edge
    North,
    /// Row 0 at the south edge
    South,
}

/// Provider backed by a TMS or XYZ tile server.
pub struct TileServerProvider {
    name: String,
    base_url: String,
    origin: RowOrigin,
    headers: Vec<(String, String)>,
    http_client: Arc<dyn AsyncHttpClient>,
}

impl TileServerProvider {
    /// Creates a tile server provider.
    ///
    /// Trailing slashes on the configured URL are dropped.
    pub fn new(
        descriptor: &ProviderDescriptor,
        origin: RowOrigin,
        http_client: Arc<dyn AsyncHttpClient>,
    ) -> Self {
        Self {
            name: descriptor.name.clone(),
            base_url: descriptor.url.trim_end_matches('/').to_string(),
            origin,
            headers: descriptor.header_pairs(),
            http_client,
        }
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the upstream URL for an XYZ-addressed tile.
    pub fn build_url(&self, tile: &Tile) -> String {
        let row = match self.origin {
            RowOrigin::North => tile.y,
            RowOrigin::South => flip_y(tile.y, tile.z),
        };
        format!("{}/{}/{}/{}.png", self.base_url, tile.z, tile.x, row)
    }

    /// Fetches `tile` from the tile server.
    pub async fn fetch(&self, tile: &Tile) -> Result<TileBody, ProviderError> {
        let url = self.build_url(tile);
        debug!(provider = %self.name, tile = %tile, url = %url, "Requesting tile");
        self.http_client.get(&url, &self.headers).await
    }
}
