//! Logging setup.
//!
//! Installs a `tracing` subscriber with:
//! - a stdout layer for interactive use
//! - an optional file layer written through a non-blocking appender
//! - an `EnvFilter` honouring `RUST_LOG`, defaulting to `info` (`debug` when
//!   requested)

use std::fs;
use std::io;
use std::path::Path;

use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the file writer alive. Dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initializes the global subscriber.
///
/// When `log_dir` is given, the directory is created and `log_file` inside it
/// is truncated before logging starts.
///
/// # Errors
///
/// Returns an error if the log directory or file cannot be prepared.
pub fn init_logging(
    log_dir: Option<&Path>,
    log_file: &str,
    debug: bool,
) -> Result<LoggingGuard, io::Error> {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_timer(LocalTime::new(Rfc3339))
        .with_target(debug);

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = file_writer(dir, log_file)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn file_writer(
    dir: &Path,
    file: &str,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), io::Error> {
    prepare_log_file(dir, file)?;
    let appender = tracing_appender::rolling::never(dir, file);
    Ok(tracing_appender::non_blocking(appender))
}

/// Creates `dir` and truncates `dir/file`.
fn prepare_log_file(dir: &Path, file: &str) -> Result<(), io::Error> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(file), "")
}
