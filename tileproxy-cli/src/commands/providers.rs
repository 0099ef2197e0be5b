//! `tileproxy providers` - list configured providers.

use std::path::PathBuf;

use clap::Args;
use tileproxy::config::ConfigFile;
use tileproxy::provider::{is_blacklisted, ProviderKind, DEFAULT_PREFETCH_BLACKLIST};

use super::common::load_config;
use crate::error::CliError;

/// Arguments for `providers`.
#[derive(Debug, Args)]
pub struct ProvidersArgs {
    /// Path to config.ini (default: ~/.tileproxy/config.ini)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

/// Run the providers command.
pub fn run(args: ProvidersArgs) -> Result<(), CliError> {
    let config = load_config(args.config)?;
    print!("{}", describe(&config));
    Ok(())
}

/// One line per provider: name, kind, source and flags.
fn describe(config: &ConfigFile) -> String {
    if config.providers.is_empty() {
        return "No providers configured\n".to_string();
    }

    let mut providers: Vec<_> = config.providers.iter().collect();
    providers.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = String::new();
    for p in providers {
        let source = match p.kind {
            ProviderKind::Archive => p
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            _ => p.url.clone(),
        };

        let mut flags = Vec::new();
        if !p.cacheable {
            flags.push("nocache".to_string());
        }
        let blacklisted = is_blacklisted(&p.url, DEFAULT_PREFETCH_BLACKLIST)
            || is_blacklisted(&p.url, config.prefetch.blacklist.as_slice());
        if !p.prefetchable || blacklisted {
            flags.push("noprefetch".to_string());
        }
        if let Some(fallback) = &p.fallback {
            flags.push(format!("fallback={}", fallback));
        }

        out.push_str(&format!("{:<16} {:<8} {}", p.name, p.kind.as_str(), source));
        if !flags.is_empty() {
            out.push_str(&format!("  [{}]", flags.join(", ")));
        }
        out.push('\n');
    }
    out
}
