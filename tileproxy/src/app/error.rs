//! Application error types.

use std::fmt;

use crate::cache::CacheError;
use crate::provider::{ProviderError, RegistryError};

/// Errors that can occur during application startup.
#[derive(Debug)]
pub enum AppError {
    /// Failed to build the shared HTTP client.
    HttpClient(ProviderError),

    /// Failed to build the provider registry.
    Registry(RegistryError),

    /// Failed to open the tile cache.
    CacheStart(CacheError),

    /// Failed to generate the placeholder tile.
    Placeholder(String),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            AppError::Registry(e) => write!(f, "Failed to build provider registry: {}", e),
            AppError::CacheStart(e) => write!(f, "Failed to open tile cache: {}", e),
            AppError::Placeholder(msg) => write!(f, "Failed to create placeholder tile: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::HttpClient(e) => Some(e),
            AppError::Registry(e) => Some(e),
            AppError::CacheStart(e) => Some(e),
            AppError::Placeholder(_) | AppError::Config(_) => None,
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(e: RegistryError) -> Self {
        AppError::Registry(e)
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::CacheStart(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config("no providers configured".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("no providers configured"));
    }

    #[test]
    fn test_app_error_from_registry_error() {
        let app_err: AppError = RegistryError::Duplicate("osm".to_string()).into();
        assert!(matches!(app_err, AppError::Registry(_)));
        assert!(std::error::Error::source(&app_err).is_some());
    }
}
