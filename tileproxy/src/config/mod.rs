//! INI configuration file.
//!
//! ```ini
//! [server]
//! port = 8580
//!
//! [cache]
//! path = ~/.cache/tileproxy
//! active = true
//! maxage = 168
//!
//! [provider.osm]
//! type = xyz
//! url = https://tile.example.org
//! header.Referer = https://my.site
//! ```
//!
//! Settings structs live in [`settings`], parsing in `parser`.

mod file;
mod parser;
mod settings;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use parser::{HEADER_KEY_PREFIX, PROVIDER_SECTION_PREFIX};
pub use settings::{
    ConfigFile, LoggingSettings, ServerSettings, DEFAULT_BIND_ADDRESS, DEFAULT_LOG_FILE,
    DEFAULT_PORT,
};
