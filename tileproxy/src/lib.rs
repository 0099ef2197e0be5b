//! tileproxy - caching reverse proxy for map tiles
//!
//! This library resolves `(provider, z, x, y)` tile requests against WMS,
//! TMS/XYZ and MBTiles providers and keeps the results in a
//! content-addressed disk cache.
//!
//! # Modules
//!
//! - [`coord`]: tile coordinates, Web Mercator bounding boxes, row flips
//! - [`provider`]: upstream adapters and the provider registry
//! - [`cache`]: blob store, SQLite index and maintenance daemon
//! - [`service`]: the resolution pipeline
//! - [`prefetch`]: pyramid-walk prefetching
//! - [`server`]: the HTTP tile endpoint
//! - [`app`]: bootstrap and shutdown

pub mod app;
pub mod body;
pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod prefetch;
pub mod provider;
pub mod server;
pub mod service;
pub mod telemetry;

pub use body::{BodySource, TileBody};
pub use coord::Tile;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
