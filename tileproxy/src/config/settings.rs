//! Settings structs for each configuration section.

use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::prefetch::PrefetchConfig;
use crate::provider::ProviderDescriptor;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 8580;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tileproxy.log";

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    /// HTTP server settings
    pub server: ServerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
    /// Tile cache settings
    pub cache: CacheConfig,
    /// Prefetch settings
    pub prefetch: PrefetchConfig,
    /// Upstream providers in file order
    pub providers: Vec<ProviderDescriptor>,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    /// Collect timing statistics for `/metrics`
    pub telemetry: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            telemetry: true,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for the log file; `None` logs to stdout only
    pub directory: Option<PathBuf>,
    pub file: String,
    pub debug: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            file: DEFAULT_LOG_FILE.to_string(),
            debug: false,
        }
    }
}
