//! Logging initialization.
//!
//! Library code logs through the `log` facade and opens `tracing` spans.
//! [`init_logging`] installs a `tracing-subscriber` registry that receives
//! both: `log` records are bridged with `tracing-log`.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Logging is already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Builds the level filter. `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber. Calling it a second time returns
/// [`TelemetryError::AlreadyInitialized`].
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    tracing_log::LogTracer::init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    let result = if config.json {
        let subscriber = tracing_subscriber::Registry::default()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = tracing_subscriber::Registry::default()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true),
            )
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
