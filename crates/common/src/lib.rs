//! Generic resilience primitives shared across registrar client crates.
//!
//! Nothing in this crate knows about the registrar wire protocol. It provides
//! the building blocks the request pipeline composes:
//! - [`resilience::Clock`]: injectable time source (`SystemClock`, `MockClock`)
//! - [`resilience::CallContext`]: caller cancellation and deadline
//! - [`resilience::TokenBucket`]: client-side request admission
//! - [`resilience::CircuitBreaker`]: fail-fast protection for a struggling
//!   upstream
//! - [`resilience::RetryExecutor`]: bounded exponential backoff with jitter

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;

pub use resilience::{
    CallContext, CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, ContextError,
    MockClock, RetryConfig, RetryExecutor, SystemClock, TokenBucket,
};
