//! Provider types and errors

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider is registered under this name
    #[error("Provider not found: {0}")]
    NotFound(String),

    /// Transport-level HTTP failure (connect, timeout, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Tile archive could not be read
    #[error("Archive error: {0}")]
    Archive(String),

    /// Upstream body could not be read
    #[error("Read error: {0}")]
    Read(String),

    /// Tile lies outside the range an archive declares
    #[error("Tile {tile} out of range: {reason}")]
    OutOfRange { tile: String, reason: String },
}

impl From<rusqlite::Error> for ProviderError {
    fn from(e: rusqlite::Error) -> Self {
        ProviderError::Archive(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ProviderError::Status {
            status: 503,
            url: "http://example.com/1/2/3.png".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from http://example.com/1/2/3.png");
    }

    #[test]
    fn test_not_found_display() {
        let err = ProviderError::NotFound("osm".to_string());
        assert!(err.to_string().contains("osm"));
    }
}
