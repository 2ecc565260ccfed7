//! Retry with exponential backoff and proportional jitter.
//!
//! The delay before retry `i` (zero based) is
//! `min(max_delay, base_delay * backoff_factor^i)`, perturbed by a uniform
//! random offset of up to `jitter_fraction` of itself and clamped back into
//! `[0, max_delay]`. Backoff sleeps go through the caller's [`CallContext`]
//! so a cancelled caller never waits out a backoff.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CallContext, ConfigError, ConfigResult, ContextError};

/// Errors returned by [`RetryExecutor::execute`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("all {attempts} attempts failed; last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },

    /// The policy refused to retry this error.
    #[error("non-retryable failure on attempt {attempts}: {source}")]
    Stopped { attempts: u32, source: E },

    /// The caller cancelled or ran out of time between attempts.
    #[error("retry interrupted after {attempts} attempts: {cause}")]
    Interrupted { attempts: u32, cause: ContextError },
}

impl<E> RetryError<E> {
    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Stopped { attempts, .. }
            | Self::Interrupted { attempts, .. } => *attempts,
        }
    }

    /// The last operation error, if the executor stopped because of one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Stopped { source, .. } => Some(source),
            Self::Interrupted { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Decision on whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the computed backoff
    Retry,
    /// Retry after a specific delay (capped at `max_delay`)
    RetryAfter(Duration),
    /// Stop retrying and return the error
    Stop,
}

/// Trait for determining whether to retry based on the error
pub trait RetryPolicy<E>: Send + Sync {
    /// `attempt` is zero based.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Multiplier applied per retry; must be at least 1.0
    pub backoff_factor: f64,
    /// Maximum relative perturbation of each delay, in `[0, 1]`
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be greater than 0"));
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigError::invalid("base_delay must not exceed max_delay"));
        }
        if !(self.backoff_factor.is_finite() && self.backoff_factor >= 1.0) {
            return Err(ConfigError::invalid("backoff_factor must be a finite number >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(ConfigError::invalid("jitter_fraction must be within [0, 1]"));
        }
        Ok(())
    }

    /// Un-jittered delay before retry `attempt` (zero based).
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() {
            Duration::from_secs_f64(capped.max(0.0))
        } else {
            self.max_delay
        }
    }

    /// Jittered delay before retry `attempt`, always within `[0, max_delay]`.
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay_for(attempt).as_secs_f64();
        if self.jitter_fraction == 0.0 || base == 0.0 {
            return Duration::from_secs_f64(base);
        }
        let offset = base * self.jitter_fraction * rng.gen_range(-1.0..=1.0);
        let jittered = (base + offset).clamp(0.0, self.max_delay.as_secs_f64());
        Duration::from_secs_f64(jittered)
    }
}

/// Builder for RetryConfig
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.config.backoff_factor = factor;
        self
    }

    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.config.jitter_fraction = fraction;
        self
    }

    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Runs an operation until it succeeds, the policy stops it, attempts run
/// out, or the caller's context ends.
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config, policy })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let mut rng = rand::thread_rng();
        self.config.delay_for(attempt, &mut rng)
    }

    /// Execute `operation`, passing it the zero-based attempt number.
    pub async fn execute<F, Fut, T, E>(
        &self,
        ctx: &CallContext,
        mut operation: F,
    ) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            if let Err(cause) = ctx.check() {
                return Err(RetryError::Interrupted { attempts: attempt, cause });
            }

            let attempt_number = attempt + 1;
            debug!(
                attempt = attempt_number,
                max_attempts = self.config.max_attempts,
                "Executing attempt"
            );

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(attempts = attempt_number, "Operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt = attempt_number, %error, "Error is not retryable");
                    return Err(RetryError::Stopped { attempts: attempt_number, source: error });
                }
                RetryDecision::Retry => self.next_delay(attempt),
                RetryDecision::RetryAfter(delay) => delay.min(self.config.max_delay),
            };

            if attempt_number >= self.config.max_attempts {
                warn!(attempts = attempt_number, %error, "Retry attempts exhausted");
                return Err(RetryError::Exhausted { attempts: attempt_number, last: error });
            }

            warn!(
                attempt = attempt_number,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %error,
                "Attempt failed, backing off"
            );
            drop(error);

            if let Err(cause) = ctx.sleep(delay).await {
                return Err(RetryError::Interrupted { attempts: attempt_number, cause });
            }
            attempt += 1;
        }
    }
}

impl<P> fmt::Debug for RetryExecutor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Common retry policies
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool + Send + Sync,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for backoff computation and the retry loop.

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::policies::*;
    use super::*;

    #[derive(Debug, Error, PartialEq, Eq)]
    enum TestError {
        #[error("temporary")]
        Temporary,
        #[error("permanent")]
        Permanent,
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .jitter_fraction(0.0)
            .build()
            .expect("valid retry config")
    }

    fn is_temporary(error: &TestError, _attempt: u32) -> bool {
        *error == TestError::Temporary
    }

    fn temporary_only() -> PredicateRetry<fn(&TestError, u32) -> bool> {
        PredicateRetry::new(is_temporary as fn(&TestError, u32) -> bool)
    }

    #[test]
    fn test_retry_config_validation() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder().backoff_factor(0.5).build().is_err());
        assert!(RetryConfig::builder().jitter_fraction(1.5).build().is_err());
        assert!(RetryConfig::builder()
            .base_delay(Duration::from_secs(10))
            .max_delay(Duration::from_secs(1))
            .build()
            .is_err());
    }

    /// Validates the un-jittered schedule for the default configuration.
    ///
    /// Assertions:
    /// - Delays double from 100ms.
    /// - The schedule saturates at `max_delay`.
    #[test]
    fn test_base_delay_schedule() {
        let config = RetryConfig::default();

        assert_eq!(config.base_delay_for(0), Duration::from_millis(100));
        assert_eq!(config.base_delay_for(1), Duration::from_millis(200));
        assert_eq!(config.base_delay_for(2), Duration::from_millis(400));
        assert_eq!(config.base_delay_for(20), Duration::from_secs(30));
        assert_eq!(config.base_delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_base_delay_is_monotonic() {
        let config = RetryConfig::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..40 {
            let delay = config.base_delay_for(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    /// Validates that jitter stays within the configured fraction and never
    /// leaves `[0, max_delay]`.
    #[test]
    fn test_jitter_bounds() {
        let config = RetryConfig::builder().jitter_fraction(0.5).build().expect("valid config");
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..30 {
            let base = config.base_delay_for(attempt).as_secs_f64();
            for _ in 0..50 {
                let delay = config.delay_for(attempt, &mut rng);
                assert!(delay <= config.max_delay);
                assert!(delay.as_secs_f64() >= base * 0.5 - 1e-9);
                assert!(delay.as_secs_f64() <= base * 1.5 + 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let config = fast_config(3);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(config.delay_for(1, &mut rng), Duration::from_millis(2));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let executor = RetryExecutor::new(fast_config(3), AlwaysRetry).expect("executor");
        let result: RetryResult<u32, TestError> =
            executor.execute(&CallContext::new(), |_| async { Ok(5) }).await;
        assert_eq!(result.ok(), Some(5));
    }

    /// Validates that transient failures are retried until success.
    ///
    /// Assertions:
    /// - Two failures then success yields `Ok`.
    /// - The operation ran three times.
    #[tokio::test]
    async fn test_retries_until_success() {
        let executor = RetryExecutor::new(fast_config(4), temporary_only()).expect("executor");
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result = executor
            .execute(&CallContext::new(), move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Temporary)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.ok(), Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_reports_attempts() {
        let executor = RetryExecutor::new(fast_config(3), temporary_only()).expect("executor");

        let result: RetryResult<(), _> = executor
            .execute(&CallContext::new(), |_| async { Err(TestError::Temporary) })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, TestError::Temporary);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let executor = RetryExecutor::new(fast_config(5), temporary_only()).expect("executor");
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: RetryResult<(), _> = executor
            .execute(&CallContext::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Permanent) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Stopped { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct HintedRetry(Duration);

    impl RetryPolicy<TestError> for HintedRetry {
        fn should_retry(&self, _error: &TestError, _attempt: u32) -> RetryDecision {
            RetryDecision::RetryAfter(self.0)
        }
    }

    /// Validates that a policy-supplied delay replaces the computed backoff
    /// and is capped at `max_delay`.
    #[tokio::test]
    async fn test_retry_after_overrides_backoff() {
        let config = RetryConfig::builder()
            .max_attempts(2)
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(60))
            .jitter_fraction(0.0)
            .build()
            .expect("valid retry config");

        let executor =
            RetryExecutor::new(config.clone(), HintedRetry(Duration::from_millis(40))).expect("executor");
        let started = std::time::Instant::now();
        let _: RetryResult<(), _> =
            executor.execute(&CallContext::new(), |_| async { Err(TestError::Temporary) }).await;
        assert!(started.elapsed() >= Duration::from_millis(40));

        let executor =
            RetryExecutor::new(config, HintedRetry(Duration::from_secs(30))).expect("executor");
        let started = std::time::Instant::now();
        let _: RetryResult<(), _> =
            executor.execute(&CallContext::new(), |_| async { Err(TestError::Temporary) }).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_into_inner() {
        let exhausted: RetryError<TestError> =
            RetryError::Exhausted { attempts: 3, last: TestError::Temporary };
        assert_eq!(exhausted.into_inner(), Some(TestError::Temporary));

        let stopped: RetryError<TestError> =
            RetryError::Stopped { attempts: 1, source: TestError::Permanent };
        assert_eq!(stopped.into_inner(), Some(TestError::Permanent));

        let interrupted: RetryError<TestError> =
            RetryError::Interrupted { attempts: 2, cause: ContextError::Cancelled };
        assert_eq!(interrupted.into_inner(), None);
    }

    #[tokio::test]
    async fn test_never_retry_policy() {
        let executor = RetryExecutor::new(fast_config(5), NeverRetry).expect("executor");
        let result: RetryResult<(), _> = executor
            .execute(&CallContext::new(), |_| async { Err(TestError::Temporary) })
            .await;
        assert_eq!(result.map_err(|e| e.attempts()).err(), Some(1));
    }

    /// Validates that cancelling during backoff ends the loop without
    /// waiting out the delay.
    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let config = RetryConfig::builder()
            .max_attempts(10)
            .base_delay(Duration::from_secs(30))
            .max_delay(Duration::from_secs(30))
            .build()
            .expect("valid config");
        let executor = RetryExecutor::new(config, AlwaysRetry).expect("executor");

        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let result: RetryResult<(), _> =
            executor.execute(&ctx, |_| async { Err(TestError::Temporary) }).await;

        assert!(matches!(
            result,
            Err(RetryError::Interrupted { attempts: 1, cause: ContextError::Cancelled })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let executor = RetryExecutor::new(fast_config(3), AlwaysRetry).expect("executor");
        let ctx = CallContext::new();
        ctx.cancel();

        let result: RetryResult<(), TestError> = executor.execute(&ctx, |_| async { Ok(()) }).await;

        assert!(matches!(result, Err(RetryError::Interrupted { attempts: 0, .. })));
    }

    #[tokio::test]
    async fn test_attempt_numbers_are_passed_through() {
        let executor = RetryExecutor::new(fast_config(3), AlwaysRetry).expect("executor");
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        let _: RetryResult<(), _> = executor
            .execute(&CallContext::new(), move |attempt| {
                log.lock().push(attempt);
                async { Err(TestError::Temporary) }
            })
            .await;

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }
}
