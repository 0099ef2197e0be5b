//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use tileproxy::config::{config_file_path, ConfigFile};
use tileproxy::logging::{init_logging, LoggingGuard};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;

/// Loads the config file given on the command line, or the default one.
pub fn load_config(path: Option<PathBuf>) -> Result<ConfigFile, CliError> {
    let path = path.unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&path)?;
    Ok(config)
}

/// Installs logging as configured.
pub fn setup_logging(config: &ConfigFile, debug: bool) -> Result<LoggingGuard, CliError> {
    init_logging(
        config.logging.directory.as_deref(),
        &config.logging.file,
        debug || config.logging.debug,
    )
    .map_err(CliError::LoggingInit)
}

/// Builds the multi-threaded runtime every command runs on.
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tileproxy")
        .build()
        .map_err(CliError::Runtime)
}

/// Returns a token cancelled on Ctrl+C.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            trigger.cancel();
        }
    });
    token
}
