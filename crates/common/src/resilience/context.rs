//! Caller-supplied cancellation and deadline.
//!
//! Every blocking step of a registrar call (limiter wait, backoff sleep,
//! network exchange) is bounded by the [`CallContext`] the caller passed in.
//! Deadlines are real wall-clock instants; they are not driven by the injected
//! [`Clock`](super::Clock).

use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a context stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("operation cancelled by caller")]
    Cancelled,

    #[error("caller deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline for one logical call.
///
/// Cloning is cheap and clones share the same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one owned by a scheduler.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel, deadline: None }
    }

    /// Set an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context whose token is cancelled with this one but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self { cancel: self.cancel.child_token(), deadline: self.deadline }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, saturating at zero. `None` without a
    /// deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail immediately if the context is already done.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.remaining() {
            Some(remaining) if remaining.is_zero() => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Sleep for `duration` unless the caller cancels or the deadline arrives
    /// first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        self.check()?;
        match self.remaining() {
            Some(remaining) if remaining < duration => {
                tokio::select! {
                    () = self.cancel.cancelled() => Err(ContextError::Cancelled),
                    () = tokio::time::sleep(remaining) => Err(ContextError::DeadlineExceeded),
                }
            }
            _ => {
                tokio::select! {
                    () = self.cancel.cancelled() => Err(ContextError::Cancelled),
                    () = tokio::time::sleep(duration) => Ok(()),
                }
            }
        }
    }

    /// Drive `future` to completion unless the context finishes first. The
    /// future is dropped on cancellation.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;
        let deadline = async {
            match self.remaining() {
                Some(remaining) => tokio::time::sleep(remaining).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ContextError::Cancelled),
            () = deadline => Err(ContextError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_live() {
        let ctx = CallContext::new();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn cancelled_context_fails_check() {
        let ctx = CallContext::new();
        ctx.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn past_deadline_fails_check() {
        let ctx = CallContext::new().with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));
    }

    #[test]
    fn child_follows_parent_cancellation() {
        let parent = CallContext::new();
        let child = parent.child();

        child.cancel();
        assert!(!parent.is_cancelled());

        let second = parent.child();
        parent.cancel();
        assert!(second.is_cancelled());
    }

    #[tokio::test]
    async fn sleep_completes_without_interference() {
        let ctx = CallContext::new();
        assert!(ctx.sleep(Duration::from_millis(5)).await.is_ok());
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));
        let started = Instant::now();

        let result = ctx.sleep(Duration::from_secs(30)).await;

        assert_eq!(result, Err(ContextError::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_cancellation() {
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = ctx.sleep(Duration::from_secs(30)).await;
        assert_eq!(result, Err(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn run_returns_future_output() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
        let value = ctx.run(async { 42 }).await;
        assert_eq!(value, Ok(42));
    }

    #[tokio::test]
    async fn run_drops_slow_future_at_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));
        let result = ctx.run(tokio::time::sleep(Duration::from_secs(30))).await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }
}
