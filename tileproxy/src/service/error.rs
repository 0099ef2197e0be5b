//! Errors surfaced by the resolution pipeline.

use std::io;

use thiserror::Error;

use crate::coord::{CoordError, Tile};
use crate::provider::ProviderError;

/// Errors from [`TileService`](super::TileService).
#[derive(Debug, Error)]
pub enum TileError {
    /// No provider is registered under this name
    #[error("unknown provider: {0}")]
    NotFound(String),

    /// Coordinates outside the tile pyramid
    #[error("invalid tile {tile}: {source}")]
    InvalidTile {
        tile: Tile,
        #[source]
        source: CoordError,
    },

    /// The provider failed to produce the tile
    #[error("upstream fetch failed for {tile}: {source}")]
    Upstream {
        tile: Tile,
        #[source]
        source: ProviderError,
    },

    /// The tile body could not be read
    #[error("failed to read body of {tile}: {source}")]
    Read {
        tile: Tile,
        #[source]
        source: io::Error,
    },
}

impl TileError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            TileError::NotFound(_) | TileError::InvalidTile { .. } => 400,
            TileError::Upstream { .. } => 502,
            TileError::Read { .. } => 500,
        }
    }
}
