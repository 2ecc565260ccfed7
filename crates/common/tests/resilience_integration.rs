//! Integration tests for resilience module
//!
//! Exercises the primitives composed the way the request pipeline composes
//! them: breaker around retry around a rate-limited operation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use registrar_common::resilience::{
    policies, BreakerError, CallContext, CircuitBreaker, CircuitBreakerConfig, CircuitState,
    MockClock, Outcome, RetryConfig, RetryError, RetryExecutor, TokenBucket,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum UpstreamError {
    #[error("upstream busy")]
    Busy,
    #[error("resource missing")]
    Missing,
    #[error("rate limiter rejected")]
    Rejected,
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(max_attempts)
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(4))
        .jitter_fraction(0.1)
        .build()
        .expect("valid retry config")
}

fn busy_is_retryable(error: &UpstreamError, _attempt: u32) -> bool {
    *error == UpstreamError::Busy
}

type BusyPolicy = policies::PredicateRetry<fn(&UpstreamError, u32) -> bool>;

fn busy_policy() -> BusyPolicy {
    policies::PredicateRetry::new(busy_is_retryable as fn(&UpstreamError, u32) -> bool)
}

fn judge<T>(result: &Result<T, RetryError<UpstreamError>>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(RetryError::Interrupted { .. }) => Outcome::Ignored,
        Err(RetryError::Stopped { source: UpstreamError::Missing, .. }) => Outcome::Ignored,
        Err(_) => Outcome::Failure,
    }
}

/// Validates that a call which keeps failing with a retryable error counts
/// once against the breaker, not once per attempt.
///
/// # Test Steps
/// 1. Run two logical calls, each exhausting three attempts
/// 2. Verify six attempts reached the upstream
/// 3. Verify the breaker recorded two failures and stays closed
#[tokio::test(flavor = "multi_thread")]
async fn test_breaker_counts_logical_calls_not_attempts() {
    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder().max_failures(3).build().expect("valid breaker config"),
    )
    .expect("breaker");
    let retry = RetryExecutor::new(fast_retry(3), busy_policy()).expect("executor");
    let ctx = CallContext::new();
    let attempts = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
        let counter = Arc::clone(&attempts);
        let result: Result<(), _> = breaker
            .execute_classified(
                || {
                    retry.execute(&ctx, move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async { Err(UpstreamError::Busy) }
                    })
                },
                judge,
            )
            .await;
        assert!(matches!(
            result,
            Err(BreakerError::Operation(RetryError::Exhausted { attempts: 3, .. }))
        ));
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 6);
    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.consecutive_failures, 2);
}

/// Validates that an ignored outcome neither trips the breaker nor counts
/// toward the failure streak.
#[tokio::test(flavor = "multi_thread")]
async fn test_missing_resources_do_not_trip_breaker() {
    let clock = MockClock::new();
    let breaker = CircuitBreaker::with_clock(
        CircuitBreakerConfig::builder().max_failures(1).build().expect("valid breaker config"),
        clock,
    )
    .expect("breaker");
    let retry = RetryExecutor::new(fast_retry(3), busy_policy()).expect("executor");
    let ctx = CallContext::new();

    for _ in 0..5 {
        let result: Result<(), _> = breaker
            .execute_classified(
                || retry.execute(&ctx, |_| async { Err(UpstreamError::Missing) }),
                judge,
            )
            .await;
        assert!(matches!(
            result,
            Err(BreakerError::Operation(RetryError::Stopped { attempts: 1, .. }))
        ));
    }

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.snapshot().consecutive_failures, 0);
}

/// Validates full recovery: open, wait out the reset timeout, probe, close.
#[tokio::test(flavor = "multi_thread")]
async fn test_breaker_recovers_after_reset_timeout() {
    let clock = MockClock::new();
    let breaker = CircuitBreaker::with_clock(
        CircuitBreakerConfig::builder()
            .max_failures(2)
            .reset_timeout(Duration::from_secs(30))
            .build()
            .expect("valid breaker config"),
        clock.clone(),
    )
    .expect("breaker");
    let retry = RetryExecutor::new(fast_retry(2), busy_policy()).expect("executor");
    let ctx = CallContext::new();

    for _ in 0..2 {
        let _: Result<(), _> = breaker
            .execute_classified(
                || retry.execute(&ctx, |_| async { Err(UpstreamError::Busy) }),
                judge,
            )
            .await;
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let rejected: Result<u32, _> = breaker
        .execute_classified(|| retry.execute(&ctx, |_| async { Ok(1) }), judge)
        .await;
    assert!(matches!(rejected, Err(BreakerError::Open { consecutive_failures: 2, .. })));

    clock.advance(Duration::from_secs(31));
    let recovered: Result<u32, _> = breaker
        .execute_classified(|| retry.execute(&ctx, |_| async { Ok(1) }), judge)
        .await;

    assert_eq!(recovered.ok(), Some(1));
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Validates that the limiter paces attempts made by the retry loop.
///
/// # Test Steps
/// 1. Bucket of one token refilling at 50/s
/// 2. Three attempts, each acquiring a token first
/// 3. Verify the two refills took at least ~40ms in total
#[tokio::test(flavor = "multi_thread")]
async fn test_limiter_paces_retry_attempts() {
    let limiter = TokenBucket::new(1.0, 50.0).expect("bucket");
    let retry = RetryExecutor::new(fast_retry(3), policies::AlwaysRetry).expect("executor");
    let ctx = CallContext::new();
    let started = Instant::now();

    let result: Result<(), _> = retry
        .execute(&ctx, |_| async {
            limiter.acquire(&ctx).await.map_err(|_| UpstreamError::Rejected)?;
            Err::<(), _>(UpstreamError::Busy)
        })
        .await;

    assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
    assert!(started.elapsed() >= Duration::from_millis(35));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_is_ignored_by_breaker() {
    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder().max_failures(1).build().expect("valid breaker config"),
    )
    .expect("breaker");
    let limiter = TokenBucket::new(1.0, 0.01).expect("bucket");
    assert!(limiter.try_acquire());
    let retry = RetryExecutor::new(fast_retry(3), policies::AlwaysRetry).expect("executor");

    let ctx = CallContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result: Result<(), _> = breaker
        .execute_classified(
            || {
                retry.execute(&ctx, |_| async {
                    limiter.acquire(&ctx).await.map_err(|_| UpstreamError::Busy)?;
                    Ok::<(), UpstreamError>(())
                })
            },
            judge,
        )
        .await;

    assert!(matches!(result, Err(BreakerError::Operation(RetryError::Interrupted { .. }))));
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.snapshot().consecutive_failures, 0);
}
