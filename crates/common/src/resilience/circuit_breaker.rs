//! Consecutive-failure circuit breaker.
//!
//! State machine:
//!
//! ```text
//! CLOSED --(max_failures consecutive failures)--> OPEN
//! OPEN --(reset_timeout elapsed since last failure)--> HALF_OPEN (one probe)
//! HALF_OPEN --(probe succeeds)--> CLOSED
//! HALF_OPEN --(probe fails)--> OPEN
//! ```
//!
//! All fields that take part in a transition live behind one mutex, so the
//! failure count, the last failure time and the mode can never be observed
//! out of step with each other.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{Clock, ConfigError, ConfigResult, SystemClock};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// A single probe request is allowed to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// How a finished operation should be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Upstream is healthy; resets the failure streak.
    Success,
    /// Upstream is struggling; extends the failure streak.
    Failure,
    /// Says nothing about upstream health (e.g. the caller cancelled).
    Ignored,
}

/// Errors returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The call was rejected without running the operation.
    #[error(
        "circuit breaker is open after {consecutive_failures} consecutive failures \
         (last failure {since_last_failure:?} ago)"
    )]
    Open { consecutive_failures: u32, since_last_failure: Duration },

    /// The operation ran and failed.
    #[error("operation failed")]
    Operation(#[source] E),
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub max_failures: u32,
    /// How long the circuit stays open after the most recent failure
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { max_failures: 5, reset_timeout: Duration::from_secs(30) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_failures == 0 {
            return Err(ConfigError::invalid("max_failures must be greater than 0"));
        }
        if self.reset_timeout.is_zero() {
            return Err(ConfigError::invalid("reset_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_failures(mut self, max_failures: u32) -> Self {
        self.config.max_failures = max_failures;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time view of the breaker for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<Instant>,
    pub total_calls: u64,
    pub rejected_calls: u64,
}

#[derive(Debug)]
struct BreakerState {
    mode: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    probe_in_flight: bool,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            mode: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            probe_in_flight: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

/// Releases the half-open probe slot if the operation future is dropped
/// before reporting an outcome.
struct AdmissionGuard<'a, C: Clock> {
    breaker: &'a CircuitBreaker<C>,
    admission: Admission,
    settled: bool,
}

impl<C: Clock> AdmissionGuard<'_, C> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.record(self.admission, outcome);
    }
}

impl<C: Clock> Drop for AdmissionGuard<'_, C> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record(self.admission, Outcome::Ignored);
        }
    }
}

/// Circuit breaker for protecting an upstream from repeated failing calls.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    clock: C,
    total_calls: AtomicU64,
    rejected_calls: AtomicU64,
}

impl CircuitBreaker<SystemClock> {
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_defaults() -> Self {
        Self::build(CircuitBreakerConfig::default(), SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a circuit breaker with a custom clock
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: CircuitBreakerConfig, clock: C) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState::closed()),
            clock,
            total_calls: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `operation`, counting every `Err` as a failure.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.execute_classified(operation, |result| {
            if result.is_ok() {
                Outcome::Success
            } else {
                Outcome::Failure
            }
        })
        .await
    }

    /// Run `operation` and let `judge` decide how the result affects upstream
    /// health.
    #[instrument(skip_all, fields(state = %self.state()))]
    pub async fn execute_classified<F, Fut, T, E, J>(
        &self,
        operation: F,
        judge: J,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
        J: FnOnce(&Result<T, E>) -> Outcome,
    {
        let admission = match self.admit() {
            Ok(admission) => admission,
            Err((consecutive_failures, since_last_failure)) => {
                self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                debug!(consecutive_failures, "Circuit breaker rejecting call");
                return Err(BreakerError::Open { consecutive_failures, since_last_failure });
            }
        };
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let guard = AdmissionGuard { breaker: self, admission, settled: false };
        let result = operation().await;
        guard.settle(judge(&result));

        result.map_err(BreakerError::Operation)
    }

    /// Decide whether a call may proceed, moving OPEN to HALF_OPEN when the
    /// reset timeout has elapsed.
    fn admit(&self) -> Result<Admission, (u32, Duration)> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let since_last_failure =
            state.last_failure_at.map_or(Duration::MAX, |at| now.saturating_duration_since(at));

        match state.mode {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                if since_last_failure > self.config.reset_timeout {
                    state.mode = CircuitState::HalfOpen;
                    state.probe_in_flight = true;
                    info!(
                        from = %CircuitState::Open,
                        to = %CircuitState::HalfOpen,
                        "Circuit breaker admitting probe request"
                    );
                    Ok(Admission::Probe)
                } else {
                    Err((state.consecutive_failures, since_last_failure))
                }
            }
            CircuitState::HalfOpen => {
                if state.probe_in_flight {
                    Err((state.consecutive_failures, since_last_failure))
                } else {
                    state.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
        }
    }

    fn record(&self, admission: Admission, outcome: Outcome) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if admission == Admission::Probe {
            state.probe_in_flight = false;
        } else if state.mode != CircuitState::Closed {
            // A call admitted before the circuit opened finished late; only
            // the probe decides what happens next.
            return;
        }

        match outcome {
            Outcome::Success => {
                if state.mode == CircuitState::HalfOpen {
                    info!(
                        from = %CircuitState::HalfOpen,
                        to = %CircuitState::Closed,
                        "Circuit breaker closed after successful probe"
                    );
                    state.mode = CircuitState::Closed;
                }
                state.consecutive_failures = 0;
            }
            Outcome::Failure => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.last_failure_at = Some(now);
                match state.mode {
                    CircuitState::Closed
                        if state.consecutive_failures >= self.config.max_failures =>
                    {
                        state.mode = CircuitState::Open;
                        warn!(
                            from = %CircuitState::Closed,
                            to = %CircuitState::Open,
                            consecutive_failures = state.consecutive_failures,
                            "Circuit breaker opened"
                        );
                    }
                    CircuitState::HalfOpen => {
                        state.mode = CircuitState::Open;
                        warn!(
                            from = %CircuitState::HalfOpen,
                            to = %CircuitState::Open,
                            consecutive_failures = state.consecutive_failures,
                            "Circuit breaker probe failed, reopening"
                        );
                    }
                    _ => {}
                }
            }
            Outcome::Ignored => {}
        }
    }

    /// Get the current circuit state
    ///
    /// Does not perform the OPEN to HALF_OPEN transition; that only happens
    /// when a call is admitted.
    pub fn state(&self) -> CircuitState {
        self.state.lock().mode
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state.lock();
        BreakerSnapshot {
            state: state.mode,
            consecutive_failures: state.consecutive_failures,
            last_failure_at: state.last_failure_at,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        *self.state.lock() = BreakerState::closed();
        info!("Circuit breaker manually reset to closed state");
    }
}

impl Default for CircuitBreaker<SystemClock> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
