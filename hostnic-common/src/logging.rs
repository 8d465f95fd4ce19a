//! Logging initialization using tracing.
//!
//! Logs are written to stderr: stdout carries the status lines that the
//! command-line tools print for their callers.

use anyhow::{anyhow, Result};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Build the filter, preferring `RUST_LOG` over the configured level.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the tracing subscriber with the specified log level.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
pub fn init_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// Initialize logging with JSON output format.
/// Suitable for runs driven by automation that collects stderr.
pub fn init_logging_json(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
