//! Cache error type.

use thiserror::Error;

/// Errors raised by the tile cache.
///
/// These never reach clients: the resolution pipeline logs them and carries
/// on without the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure in the blob tree
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index store failure
    #[error("Index error: {0}")]
    Index(String),

    /// Index entry could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A blocking cache task panicked or was cancelled
    #[error("Cache task failed: {0}")]
    Join(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Index(e.to_string())
    }
}

impl From<bincode::Error> for CacheError {
    fn from(e: bincode::Error) -> Self {
        CacheError::Encoding(e.to_string())
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(e: tokio::task::JoinError) -> Self {
        CacheError::Join(e.to_string())
    }
}
