//! `tileproxy serve` - run the HTTP tile server.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use tileproxy::app::{AppConfig, TileProxyApp};
use tileproxy::server;
use tokio::net::TcpListener;

use super::common::{load_config, runtime, setup_logging, shutdown_on_ctrl_c};
use crate::error::CliError;

/// Arguments for `serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Path to config.ini (default: ~/.tileproxy/config.ini)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides [server] port)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Run the serve command.
pub fn run(args: ServeArgs) -> Result<(), CliError> {
    let config = load_config(args.config)?;
    let _logging = setup_logging(&config, args.debug)?;

    let bind = config.server.bind.clone();
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port).parse().map_err(|_| {
        CliError::InvalidArgument(format!("invalid listen address {}:{}", bind, port))
    })?;

    runtime()?.block_on(async move {
        let app = TileProxyApp::start(AppConfig::from_config_file(&config)).await?;
        let shutdown = shutdown_on_ctrl_c();

        let result = match TcpListener::bind(addr).await {
            Ok(listener) => server::serve(listener, app.service(), shutdown)
                .await
                .map_err(CliError::Serve),
            Err(e) => Err(CliError::Serve(e)),
        };

        app.shutdown().await;
        result
    })
}
