//! `tileproxy prefetch` - fill the cache with whole tile pyramids.

use std::path::PathBuf;

use clap::Args;
use tileproxy::app::{AppConfig, TileProxyApp};
use tileproxy::prefetch::{split_provider_list, PrefetchScheduler};
use tracing::warn;

use super::common::{load_config, runtime, setup_logging, shutdown_on_ctrl_c};
use crate::error::CliError;

/// Arguments for `prefetch`.
#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Providers to prefetch, separated by spaces, commas or semicolons
    #[arg(long)]
    pub providers: String,

    /// Highest zoom level to fetch (every level from 0 up is walked)
    #[arg(long)]
    pub max_zoom: u8,

    /// Path to config.ini (default: ~/.tileproxy/config.ini)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Concurrent workers (overrides [prefetch] workers)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Run the prefetch command.
pub fn run(args: PrefetchArgs) -> Result<(), CliError> {
    let providers = split_provider_list(&args.providers);
    if providers.is_empty() {
        return Err(CliError::InvalidArgument(
            "--providers must name at least one provider".to_string(),
        ));
    }
    if args.workers == Some(0) {
        return Err(CliError::InvalidArgument(
            "--workers must be at least 1".to_string(),
        ));
    }

    let config = load_config(args.config)?;
    let _logging = setup_logging(&config, args.debug)?;
    let workers = args.workers.unwrap_or(config.prefetch.workers);

    runtime()?.block_on(async move {
        let app = TileProxyApp::start(AppConfig::from_config_file(&config)).await?;
        let service = app.service();
        if !service.cache().is_active() {
            warn!("Cache is inactive, prefetched tiles will not be stored");
        }
        for name in &providers {
            if !service.registry().has_provider(name) {
                warn!(provider = %name, "Unknown provider, its tiles will be skipped");
            }
        }

        let report = PrefetchScheduler::new(service, workers)
            .with_cancellation(shutdown_on_ctrl_c())
            .run(&providers, args.max_zoom)
            .await;

        app.shutdown().await;
        println!("Prefetch complete: {}", report);
        Ok(())
    })
}
