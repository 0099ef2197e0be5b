//! tileproxy CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tileproxy library.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::prefetch::PrefetchArgs;
use commands::providers::ProvidersArgs;
use commands::serve::ServeArgs;

#[derive(Parser)]
#[command(name = "tileproxy")]
#[command(version, about = "Caching reverse proxy for map tiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP tile server
    Serve(ServeArgs),
    /// Fetch whole tile pyramids into the cache
    Prefetch(PrefetchArgs),
    /// List configured providers
    Providers(ProvidersArgs),
    /// Inspect or maintain the tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args),
        Commands::Prefetch(args) => commands::prefetch::run(args),
        Commands::Providers(args) => commands::providers::run(args),
        Commands::Cache { action } => commands::cache::run(action),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_prefetch() {
        let cli = Cli::try_parse_from([
            "tileproxy",
            "prefetch",
            "--providers",
            "osm, sea",
            "--max-zoom",
            "4",
            "--workers",
            "8",
        ])
        .unwrap();
        match cli.command {
            Commands::Prefetch(args) => {
                assert_eq!(args.providers, "osm, sea");
                assert_eq!(args.max_zoom, 4);
                assert_eq!(args.workers, Some(8));
            }
            _ => panic!("expected prefetch"),
        }
    }

    #[test]
    fn test_parse_serve_port() {
        let cli = Cli::try_parse_from(["tileproxy", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve(ServeArgs {
                port: Some(9000),
                ..
            })
        ));
    }
}
