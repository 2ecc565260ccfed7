//! Token bucket admission control.
//!
//! The bucket holds a fractional token count that refills continuously at a
//! fixed rate up to its capacity. Each outbound request spends exactly one
//! token. Callers either probe with [`TokenBucket::try_acquire`] or wait with
//! [`TokenBucket::acquire`], which honours the caller's [`CallContext`].

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use super::{CallContext, Clock, ConfigError, ConfigResult, ContextError, SystemClock};

// Absorbs floating point drift so a bucket refilled for exactly one token
// period is not rejected for being 1e-16 short.
const TOKEN_EPSILON: f64 = 1e-9;

// Never spin faster than this while waiting for a token.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Slowest accepted refill rate: one token every 1000 seconds.
pub const MIN_REFILL_PER_SECOND: f64 = 1e-3;

/// Configuration for token bucket rate limiter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold (burst size)
    pub capacity: f64,
    /// Tokens added per second
    pub refill_per_second: f64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self { capacity: 5.0, refill_per_second: 2.0 }
    }
}

impl TokenBucketConfig {
    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.capacity.is_finite() && self.capacity >= 1.0) {
            return Err(ConfigError::invalid("capacity must be a finite number >= 1"));
        }
        if !(self.refill_per_second.is_finite() && self.refill_per_second >= MIN_REFILL_PER_SECOND)
        {
            return Err(ConfigError::invalid(format!(
                "refill_per_second must be a finite number >= {MIN_REFILL_PER_SECOND}"
            )));
        }
        Ok(())
    }

    /// Time needed to accumulate `deficit` tokens, saturating at
    /// [`Duration::MAX`].
    fn time_for(&self, deficit: f64) -> Duration {
        Duration::try_from_secs_f64((deficit / self.refill_per_second).max(0.0))
            .unwrap_or(Duration::MAX)
    }
}

/// Why [`TokenBucket::acquire`] gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("rate limiter wait cancelled by caller")]
    Cancelled,

    /// The next token would arrive after the caller's deadline.
    #[error("next token available in {wait:?}, after the caller deadline")]
    DeadlineExceeded { wait: Duration },
}

impl From<ContextError> for AcquireError {
    fn from(error: ContextError) -> Self {
        match error {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::DeadlineExceeded { wait: Duration::ZERO },
        }
    }
}

struct BucketState {
    config: TokenBucketConfig,
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        let added = elapsed.as_secs_f64() * self.config.refill_per_second;
        self.tokens = (self.tokens + added).min(self.config.capacity);
        self.last_refill = now;
    }

    /// Spend one token if available, otherwise report the deficit.
    fn take(&mut self) -> Result<(), f64> {
        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            Ok(())
        } else {
            Err(1.0 - self.tokens)
        }
    }
}

/// Token bucket rate limiter
///
/// Starts full. The state, limits included, lives behind a single mutex that
/// is never held across an await point, so many tasks can share one bucket.
pub struct TokenBucket<C: Clock = SystemClock> {
    state: Mutex<BucketState>,
    clock: C,
}

impl TokenBucket<SystemClock> {
    /// Create a bucket holding `capacity` tokens that refills at
    /// `refill_per_second`.
    pub fn new(capacity: f64, refill_per_second: f64) -> ConfigResult<Self> {
        Self::with_clock(capacity, refill_per_second, SystemClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Create a new token bucket with custom clock
    pub fn with_clock(capacity: f64, refill_per_second: f64, clock: C) -> ConfigResult<Self> {
        Self::from_config(TokenBucketConfig { capacity, refill_per_second }, clock)
    }

    pub fn from_config(config: TokenBucketConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        let state = BucketState { config, tokens: config.capacity, last_refill: clock.now() };
        Ok(Self { state: Mutex::new(state), clock })
    }

    pub fn config(&self) -> TokenBucketConfig {
        self.state.lock().config
    }

    pub fn capacity(&self) -> f64 {
        self.state.lock().config.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.state.lock().config.refill_per_second
    }

    /// Replace the limits at runtime.
    ///
    /// Tokens accrued under the old rate are kept, clamped to the new
    /// capacity. Waiters pick up the new rate on their next wake-up.
    pub fn update_limit(&self, capacity: f64, refill_per_second: f64) -> ConfigResult<()> {
        let config = TokenBucketConfig { capacity, refill_per_second };
        config.validate()?;

        let now = self.clock.now();
        let mut state = self.state.lock();
        state.refill(now);
        state.config = config;
        state.tokens = state.tokens.min(capacity);
        debug!(capacity, refill_per_second, "Rate limit updated");
        Ok(())
    }

    /// Take one token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.refill(now);
        let admitted = state.take().is_ok();
        if !admitted {
            debug!(tokens = state.tokens, "Rate limit: no token available");
        }
        admitted
    }

    /// Wait until a token is available, then take it.
    ///
    /// Fails with [`AcquireError::Cancelled`] when the caller cancels while
    /// waiting, and fails fast with [`AcquireError::DeadlineExceeded`] when
    /// the next token cannot arrive before the caller's deadline.
    pub async fn acquire(&self, ctx: &CallContext) -> Result<(), AcquireError> {
        loop {
            ctx.check()?;

            let wait = {
                let now = self.clock.now();
                let mut state = self.state.lock();
                state.refill(now);
                match state.take() {
                    Ok(()) => return Ok(()),
                    Err(deficit) => state.config.time_for(deficit).max(MIN_WAIT),
                }
            };

            if let Some(remaining) = ctx.remaining() {
                if wait > remaining {
                    debug!(?wait, ?remaining, "Rate limit: token would arrive after deadline");
                    return Err(AcquireError::DeadlineExceeded { wait });
                }
            }

            debug!(?wait, "Rate limit: waiting for token");
            ctx.sleep(wait).await?;
        }
    }

    /// Current token count after applying any pending refill.
    pub fn available_tokens(&self) -> f64 {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.refill(now);
        state.tokens
    }

    /// Refill the bucket to capacity.
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.tokens = state.config.capacity;
        state.last_refill = now;
    }
}

impl<C: Clock> fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TokenBucket")
            .field("capacity", &state.config.capacity)
            .field("refill_per_second", &state.config.refill_per_second)
            .field("tokens", &state.tokens)
            .finish_non_exhaustive()
    }
}
