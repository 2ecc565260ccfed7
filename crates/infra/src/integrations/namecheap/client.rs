use registrar_common::resilience::{BreakerSnapshot, Clock, SystemClock};
use registrar_domain::{ClientConfig, RateLimitConfig, RegistrarError, Result};

use super::command::Command;
use super::pipeline::RequestPipeline;
use crate::http::{HttpTransport, Transport};

/// Code carried by `NotFound` errors raised locally, for lookups the registrar
/// answered successfully but without the requested item.
pub const LOCAL_NOT_FOUND: &str = "LOCAL";

/// Typed registrar operations on top of a [`RequestPipeline`].
///
/// The operations are grouped by area in the sibling modules (`domains`,
/// `dns`, `ssl`, `whoisguard`, `users`). All of them go through the same
/// limiter and breaker.
pub struct NamecheapClient<T: Transport = HttpTransport, C: Clock = SystemClock> {
    pipeline: RequestPipeline<T, C>,
}

impl NamecheapClient<HttpTransport, SystemClock> {
    /// # Errors
    /// `RegistrarError::Config` when the configuration is invalid.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_pipeline(RequestPipeline::from_config(config)?))
    }
}

impl<T: Transport, C: Clock> NamecheapClient<T, C> {
    pub fn with_pipeline(pipeline: RequestPipeline<T, C>) -> Self {
        Self { pipeline }
    }

    /// The underlying pipeline, for commands without a typed wrapper.
    pub fn pipeline(&self) -> &RequestPipeline<T, C> {
        &self.pipeline
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.pipeline.breaker_snapshot()
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        self.pipeline.rate_limit()
    }

    /// See [`RequestPipeline::update_rate_limit`].
    pub fn update_rate_limit(&self, limits: &RateLimitConfig) -> Result<()> {
        self.pipeline.update_rate_limit(limits)
    }
}

pub(crate) fn not_found(message: impl Into<String>) -> RegistrarError {
    RegistrarError::NotFound { code: LOCAL_NOT_FOUND.to_string(), message: message.into() }
}

/// `OperationFailed` for a command the registrar answered with a negative flag.
pub(crate) fn operation_failed(command: &Command, reason: impl Into<String>) -> RegistrarError {
    RegistrarError::OperationFailed { command: command.name().to_string(), reason: reason.into() }
}

pub(crate) fn require_positive(field: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(RegistrarError::InvalidInput(format!("{field} must be at least 1")));
    }
    Ok(())
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistrarError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
