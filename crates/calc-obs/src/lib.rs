//! Observability: the log sink handed to each component, log setup, and metrics

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub mod logger;
pub mod metrics;

pub use logger::{LogLevel, Logger, MemoryLogger, Role, TracingLogger};

pub const CONSUMER_LOG_FILE: &str = "consumer.log";
pub const PRODUCER_LOG_FILE: &str = "producers.log";

/// Console gets `RUST_LOG` (default `error`); `<log_dir>/<file_name>` gets everything at info.
/// Keep the returned guard alive or buffered lines are lost on exit.
pub fn init_tracing(log_dir: &Path, file_name: &str) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::never(log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let console_filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "error".into()));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_filter))
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    metrics::init();
    Ok(guard)
}
