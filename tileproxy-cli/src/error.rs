//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::io;
use std::process;

use tileproxy::app::AppError;
use tileproxy::cache::CacheError;
use tileproxy::config::ConfigFileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Failed to load the configuration file
    Config(ConfigFileError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to start the tile proxy
    Startup(AppError),
    /// Failed to create the Tokio runtime
    Runtime(io::Error),
    /// HTTP server error
    Serve(io::Error),
    /// Cache operation failed
    Cache(CacheError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Serve(e) if e.kind() == io::ErrorKind::AddrInUse => {
                eprintln!();
                eprintln!("Another process is listening on that port.");
                eprintln!("Pick a different one with --port or [server] port in config.ini");
            }
            CliError::Startup(AppError::Config(_)) => {
                eprintln!();
                eprintln!("Add at least one [provider.NAME] section to config.ini, e.g.:");
                eprintln!("  [provider.osm]");
                eprintln!("  type = xyz");
                eprintln!("  url = https://tile.example.org");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "{}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Startup(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to create async runtime: {}", e),
            CliError::Serve(e) => write!(f, "HTTP server error: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Startup(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Serve(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Startup(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_argument() {
        let err = CliError::InvalidArgument("no providers given".to_string());
        assert_eq!(err.to_string(), "Invalid argument: no providers given");
    }

    #[test]
    fn test_from_app_error() {
        let err: CliError = AppError::Config("empty".to_string()).into();
        assert!(matches!(err, CliError::Startup(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
