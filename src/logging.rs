use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::LogConfig;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "XCCONSOLE_LOG";

const LOG_FILE: &str = "xcconsole.log";

/// Route tracing output to a daily rolling file
///
/// The terminal belongs to the UI, so nothing is written to stdout or stderr.
/// Keep the returned guard alive until exit to flush buffered records.
pub fn init_tracing(config: &LogConfig) -> io::Result<WorkerGuard> {
    let dir = config.dir();
    fs::create_dir_all(&dir)?;
    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter(&config.level))
        .with(file_layer)
        .init();

    Ok(file_guard)
}

fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
