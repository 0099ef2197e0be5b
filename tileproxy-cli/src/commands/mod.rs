//! CLI command implementations.
//!
//! - [`serve`] - Run the HTTP tile server
//! - [`prefetch`] - Walk tile pyramids into the cache
//! - [`providers`] - List configured providers
//! - [`cache`] - Cache statistics and maintenance

pub mod cache;
pub mod common;
pub mod prefetch;
pub mod providers;
pub mod serve;
