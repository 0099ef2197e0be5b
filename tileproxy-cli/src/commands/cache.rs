//! Cache management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use tileproxy::cache::TileCache;

use super::common::{load_config, runtime};
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show blob and index statistics
    Stats {
        /// Path to config.ini (default: ~/.tileproxy/config.ini)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
    /// Run one maintenance cycle (age sweep and index compaction) now
    Maintain {
        /// Path to config.ini (default: ~/.tileproxy/config.ini)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config_path = match &action {
        CacheAction::Stats { config } | CacheAction::Maintain { config } => config.clone(),
    };
    let config = load_config(config_path)?;
    let cache_config = config.cache.clone().with_active(true);
    let root = cache_config.path.clone();

    runtime()?.block_on(async move {
        let cache = TileCache::open(cache_config).await?;

        let result = match action {
            CacheAction::Stats { .. } => cache.stats().await.map(|stats| {
                println!("Tile cache: {}", root.display());
                println!("  Blobs:         {}", stats.blob_count);
                println!("  Size:          {} bytes", stats.total_bytes);
                println!("  Index entries: {}", stats.index_entries);
            }),
            CacheAction::Maintain { .. } => cache.run_maintenance().await.map(|report| {
                println!("Maintenance complete: {}", report);
            }),
        };

        cache.close().await?;
        result.map_err(CliError::from)
    })
}
