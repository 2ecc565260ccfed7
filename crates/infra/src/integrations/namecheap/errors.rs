//! Classification of failed attempts
//!
//! Every attempt that does not produce a payload ends in exactly one
//! [`ClassifiedError`]. The classification drives three decisions: whether
//! the retry executor tries again, how the circuit breaker counts the call,
//! and which [`RegistrarError`] the caller finally sees. Only the pipeline
//! performs that last conversion.

use std::time::Duration;

use registrar_common::resilience::{
    AcquireError, ContextError, Outcome, RetryDecision, RetryError, RetryPolicy,
};
use registrar_domain::RegistrarError;
use thiserror::Error;

use crate::http::TransportError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifiedError {
    /// Network failure, timeout or server-side error.
    #[error("transient failure: {reason}")]
    Transient { reason: String },

    /// The registrar asked us to slow down, optionally saying for how long.
    #[error("rate limited by registrar: {reason}")]
    RateLimited { reason: String, retry_after: Option<Duration> },

    /// The registrar rejected the request; its code and message are verbatim.
    #[error("registrar error {code}: {message}")]
    Fatal { code: String, message: String },

    #[error("not found ({code}): {message}")]
    NotFound { code: String, message: String },

    /// The response could not be understood.
    #[error("malformed response: {detail}")]
    Malformed { detail: String },

    /// The local limiter could not admit the attempt before the caller deadline.
    #[error("no request slot before the caller deadline")]
    Throttled,

    #[error(transparent)]
    Interrupted(#[from] ContextError),
}

impl ClassifiedError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into() }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed { detail: detail.into() }
    }

    pub fn rate_limited(reason: impl Into<String>) -> Self {
        Self::RateLimited { reason: reason.into(), retry_after: None }
    }

    /// Attach the server's `Retry-After` hint to a rate-limit classification.
    /// Other classifications are returned unchanged.
    pub fn with_retry_after(self, hint: Option<Duration>) -> Self {
        match (self, hint) {
            (Self::RateLimited { reason, .. }, Some(delay)) => {
                Self::RateLimited { reason, retry_after: Some(delay) }
            }
            (other, _) => other,
        }
    }

    /// Only transient failures and provider rate limiting are worth another
    /// attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }

    /// How a call that ended with this error counts toward upstream health.
    ///
    /// Every failed command counts, rejections included. A not-found answer
    /// is an expected lookup result, so it neither counts nor clears the
    /// streak; neither do local throttling and caller cancellation.
    pub fn breaker_outcome(&self) -> Outcome {
        match self {
            Self::Transient { .. }
            | Self::RateLimited { .. }
            | Self::Fatal { .. }
            | Self::Malformed { .. } => Outcome::Failure,
            Self::NotFound { .. } | Self::Throttled | Self::Interrupted(_) => Outcome::Ignored,
        }
    }

    /// Caller-facing error after `attempts` attempts.
    pub fn into_registrar(self, attempts: u32) -> RegistrarError {
        match self {
            Self::Transient { reason } => RegistrarError::Transient { attempts, cause: reason },
            Self::RateLimited { reason, .. } => {
                RegistrarError::Transient { attempts, cause: format!("rate limited: {reason}") }
            }
            Self::Fatal { code, message } => {
                RegistrarError::RemoteRejected { code, message, attempts }
            }
            Self::NotFound { code, message } => RegistrarError::NotFound { code, message },
            Self::Malformed { detail } => RegistrarError::ProtocolError { detail },
            Self::Throttled => RegistrarError::RateLimitExceeded,
            Self::Interrupted(_) => RegistrarError::Canceled,
        }
    }
}

impl From<TransportError> for ClassifiedError {
    fn from(error: TransportError) -> Self {
        if error.is_retryable() {
            Self::Transient { reason: error.to_string() }
        } else {
            Self::Fatal { code: "TRANSPORT".to_string(), message: error.to_string() }
        }
    }
}

impl From<AcquireError> for ClassifiedError {
    fn from(error: AcquireError) -> Self {
        match error {
            AcquireError::Cancelled => Self::Interrupted(ContextError::Cancelled),
            AcquireError::DeadlineExceeded { .. } => Self::Throttled,
        }
    }
}

/// Breaker verdict for the outcome of a whole retried call.
pub fn judge_call<T>(result: &Result<T, RetryError<ClassifiedError>>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(RetryError::Exhausted { last, .. }) => last.breaker_outcome(),
        Err(RetryError::Stopped { source, .. }) => source.breaker_outcome(),
        Err(RetryError::Interrupted { .. }) => Outcome::Ignored,
    }
}

/// Retries transient failures and provider rate limiting; stops on
/// everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrarRetryPolicy;

impl RetryPolicy<ClassifiedError> for RegistrarRetryPolicy {
    fn should_retry(&self, error: &ClassifiedError, _attempt: u32) -> RetryDecision {
        match error {
            ClassifiedError::RateLimited { retry_after: Some(delay), .. } => {
                RetryDecision::RetryAfter(*delay)
            }
            error if error.is_retryable() => RetryDecision::Retry,
            _ => RetryDecision::Stop,
        }
    }
}
