//! Resilience benchmarks
//!
//! Hot-path costs of the primitives every registrar call passes through:
//! token admission, breaker admission/accounting and backoff computation.
//!
//! Run with: `cargo bench --bench resilience_bench -p registrar-common`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use registrar_common::resilience::{
    policies, CallContext, CircuitBreaker, CircuitBreakerConfig, MockClock, RetryConfig,
    RetryExecutor, TokenBucket,
};
use tokio::runtime::Builder as RuntimeBuilder;

#[derive(Debug, thiserror::Error)]
#[error("benchmark failure")]
struct BenchError;

fn build_runtime() -> tokio::runtime::Runtime {
    RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime should build for benchmarks")
}

// ============================================================================
// Token Bucket Benchmarks
// ============================================================================

fn bench_token_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_bucket");

    group.bench_function("try_acquire_refilling", |b| {
        let clock = MockClock::new();
        let bucket = TokenBucket::with_clock(5.0, 2.0, clock.clone())
            .expect("valid bucket configuration for benchmarks");
        b.iter(|| {
            clock.advance_millis(500);
            black_box(bucket.try_acquire());
        });
    });

    group.bench_function("try_acquire_empty", |b| {
        let bucket = TokenBucket::with_clock(1.0, 0.001, MockClock::new())
            .expect("valid bucket configuration for benchmarks");
        let _ = bucket.try_acquire();
        b.iter(|| black_box(bucket.try_acquire()));
    });

    let runtime = build_runtime();
    group.bench_function("acquire_available", |b| {
        let clock = MockClock::new();
        let bucket = TokenBucket::with_clock(1_000.0, 1.0, clock.clone())
            .expect("valid bucket configuration for benchmarks");
        let ctx = CallContext::new();
        b.iter(|| {
            clock.advance(Duration::from_secs(1));
            runtime.block_on(async { black_box(bucket.acquire(&ctx).await) })
        });
    });

    group.finish();
}

// ============================================================================
// Circuit Breaker Benchmarks
// ============================================================================

fn bench_circuit_breaker(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker");
    let runtime = build_runtime();

    group.bench_function("closed_success", |b| {
        let breaker = CircuitBreaker::with_defaults();
        b.iter(|| {
            runtime.block_on(async {
                black_box(breaker.execute(|| async { Ok::<_, BenchError>(()) }).await)
            })
        });
    });

    group.bench_function("open_short_circuit", |b| {
        let config = CircuitBreakerConfig::builder()
            .max_failures(1)
            .reset_timeout(Duration::from_secs(3600))
            .build()
            .expect("valid circuit breaker config for benchmarks");
        let breaker = CircuitBreaker::new(config).expect("circuit breaker should build");
        runtime.block_on(async {
            let _ = breaker.execute(|| async { Err::<(), _>(BenchError) }).await;
        });

        b.iter(|| {
            runtime.block_on(async {
                black_box(breaker.execute(|| async { Ok::<_, BenchError>(()) }).await)
            })
        });
    });

    group.finish();
}

// ============================================================================
// Retry Benchmarks
// ============================================================================

fn bench_retry_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry_backoff");
    let config = RetryConfig::default();

    for attempt in [0u32, 4, 16] {
        group.bench_with_input(BenchmarkId::new("delay_for", attempt), &attempt, |b, &attempt| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| black_box(config.delay_for(black_box(attempt), &mut rng)));
        });
    }

    let runtime = build_runtime();
    group.bench_function("executor_first_attempt_success", |b| {
        let executor = RetryExecutor::new(RetryConfig::default(), policies::AlwaysRetry)
            .expect("valid retry config for benchmarks");
        let ctx = CallContext::new();
        b.iter(|| {
            runtime.block_on(async {
                black_box(executor.execute(&ctx, |_| async { Ok::<_, BenchError>(1u32) }).await)
            })
        });
    });

    group.finish();
}

criterion_group!(resilience, bench_token_bucket, bench_circuit_breaker, bench_retry_backoff);
criterion_main!(resilience);
