//! Logging and tracing initialization.
//!
//! Logs go to stderr so that command output on stdout stays machine-readable,
//! or to the file named in [`LoggingConfig::file`].

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init_logging(config: &LoggingConfig) {
    let file = config.file.as_deref().and_then(open_log_file);

    match (config.json, file) {
        (true, Some(file)) => install(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter(config))
                .json()
                .with_writer(Mutex::new(file))
                .finish(),
        ),
        (true, None) => install(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter(config))
                .json()
                .with_writer(std::io::stderr)
                .finish(),
        ),
        (false, Some(file)) => install(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter(config))
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish(),
        ),
        (false, None) => install(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter(config))
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

fn install<S>(subscriber: S)
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {}: {e}", path.display());
            None
        }
    }
}
