//! Application bootstrap and lifecycle management.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                     TileProxyApp                       │
//! │                                                        │
//! │  AsyncReqwestClient ──► ProviderRegistry ──┐           │
//! │                                            ├─► TileService
//! │  TileCache (+ maintenance daemon) ─────────┤           │
//! │  Measurements ─────────────────────────────┘           │
//! └───────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::TileProxyApp;
pub use config::AppConfig;
pub use error::AppError;
