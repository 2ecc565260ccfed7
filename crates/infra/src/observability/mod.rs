//! Logging setup
//!
//! Library code only emits `tracing` events. Binaries install a subscriber
//! once at startup with [`init_tracing`]; `RUST_LOG` overrides the default
//! filter.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,registrar_infra=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    AlreadyInitialized(String),
}

/// Install the global fmt subscriber.
///
/// # Errors
/// `InvalidFilter` when `default_filter` does not parse, and
/// `AlreadyInitialized` when a global subscriber is already set.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> Result<(), ObservabilityError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
            ObservabilityError::InvalidFilter {
                filter: default_filter.to_string(),
                reason: e.to_string(),
            }
        })?,
    };

    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ObservabilityError::AlreadyInitialized(e.to_string()))
}
