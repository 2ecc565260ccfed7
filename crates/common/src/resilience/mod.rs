//! Resilience patterns for talking to a rate-limited, occasionally flaky
//! upstream.
//!
//! The pieces are independent and generic over their error types so they can
//! be tested in isolation and composed by the caller:
//!
//! ```text
//! CircuitBreaker::execute_classified(
//!     RetryExecutor::execute(ctx,
//!         TokenBucket::acquire(ctx) -> exchange -> decode))
//! ```
//!
//! All time-dependent state reads the injected [`Clock`], so state machines
//! can be driven deterministically with [`MockClock`]. Sleeping always goes
//! through [`CallContext`], which makes every wait cancellable.

pub mod circuit_breaker;
pub mod clock;
pub mod context;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    BreakerError, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitState, Outcome,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use context::{CallContext, ContextError};
pub use rate_limiter::{AcquireError, TokenBucket, TokenBucketConfig};
pub use retry::{
    policies, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError, RetryExecutor,
    RetryPolicy, RetryResult,
};

use thiserror::Error;

/// Configuration validation error shared by every primitive in this module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;
