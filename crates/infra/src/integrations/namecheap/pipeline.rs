//! Request pipeline
//!
//! Every command runs through the same stack:
//!
//! ```text
//! breaker.execute_classified(
//!     retry.execute(
//!         limiter.acquire -> encode -> exchange (per-attempt timeout) -> decode -> extract
//!     )
//! )
//! ```
//!
//! The breaker sees one logical call however many attempts it took, and every
//! attempt (first or retry) waits for its own limiter token.

use std::time::Duration;

use registrar_common::resilience::{
    BreakerError, BreakerSnapshot, CallContext, CircuitBreaker, CircuitBreakerConfig, Clock,
    ConfigError, RetryConfig, RetryError, RetryExecutor, SystemClock, TokenBucket,
};
use registrar_domain::{ClientConfig, Credentials, RateLimitConfig, RegistrarError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::codec::{decode, decode_payload, encode, Envelope};
use super::command::Command;
use super::errors::{judge_call, ClassifiedError, RegistrarRetryPolicy};
use crate::http::{HttpTransport, Transport};

fn config_error(error: ConfigError) -> RegistrarError {
    RegistrarError::Config(error.to_string())
}

/// Resilient executor for registrar commands.
///
/// Owns one rate limiter and one circuit breaker; share the pipeline (or the
/// client wrapping it) rather than building one per call.
pub struct RequestPipeline<T: Transport = HttpTransport, C: Clock = SystemClock> {
    credentials: Credentials,
    endpoint: String,
    attempt_timeout: Duration,
    transport: T,
    limiter: TokenBucket<C>,
    breaker: CircuitBreaker<C>,
    retry: RetryExecutor<RegistrarRetryPolicy>,
}

impl RequestPipeline<HttpTransport, SystemClock> {
    /// Build a pipeline talking HTTP to the configured endpoint.
    ///
    /// # Errors
    /// `RegistrarError::Config` when the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::builder()
            .timeout(config.http.attempt_timeout())
            .user_agent(config.http.user_agent.clone())
            .build()
            .map_err(|err| RegistrarError::Config(format!("failed to build HTTP client: {err}")))?;
        Self::with_parts(config, transport, SystemClock)
    }
}

impl<T: Transport, C: Clock + Clone> RequestPipeline<T, C> {
    /// Build a pipeline from explicit parts; tests inject transports and
    /// clocks here.
    pub fn with_parts(config: &ClientConfig, transport: T, clock: C) -> Result<Self> {
        config.validate()?;

        let limiter = TokenBucket::with_clock(
            f64::from(config.rate_limit.burst),
            config.rate_limit.requests_per_second,
            clock.clone(),
        )
        .map_err(config_error)?;

        let breaker = CircuitBreaker::with_clock(
            CircuitBreakerConfig {
                max_failures: config.circuit_breaker.max_failures,
                reset_timeout: config.circuit_breaker.reset_timeout(),
            },
            clock,
        )
        .map_err(config_error)?;

        let retry = RetryExecutor::new(
            RetryConfig {
                max_attempts: config.retry.max_attempts,
                base_delay: config.retry.base_delay(),
                max_delay: config.retry.max_delay(),
                backoff_factor: config.retry.backoff_factor,
                jitter_fraction: config.retry.jitter_fraction,
            },
            RegistrarRetryPolicy,
        )
        .map_err(config_error)?;

        Ok(Self {
            credentials: config.credentials.clone(),
            endpoint: config.endpoint.url().to_string(),
            attempt_timeout: config.http.attempt_timeout(),
            transport,
            limiter,
            breaker,
            retry,
        })
    }
}

impl<T: Transport, C: Clock> RequestPipeline<T, C> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Force the breaker closed.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    pub fn available_tokens(&self) -> f64 {
        self.limiter.available_tokens()
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        let limits = self.limiter.config();
        RateLimitConfig {
            requests_per_second: limits.refill_per_second,
            burst: limits.capacity as u32,
        }
    }

    /// Re-tune the limiter without rebuilding the client, e.g. after the
    /// account's allowance changes. In-flight waits pick up the new rate.
    ///
    /// # Errors
    /// `RegistrarError::Config` when the limits are invalid; the old limits
    /// stay in force.
    pub fn update_rate_limit(&self, limits: &RateLimitConfig) -> Result<()> {
        self.limiter
            .update_limit(f64::from(limits.burst), limits.requests_per_second)
            .map_err(config_error)?;
        info!(
            requests_per_second = limits.requests_per_second,
            burst = limits.burst,
            "Registrar rate limit updated"
        );
        Ok(())
    }

    /// Run `command` and return the OK envelope undecoded.
    #[instrument(skip(self, ctx, command), fields(command = %command.name()))]
    pub async fn execute_command(&self, ctx: &CallContext, command: &Command) -> Result<Envelope> {
        self.execute_with(ctx, command, Ok).await
    }

    /// Run `command` and decode its `CommandResponse` into `P`.
    #[instrument(skip(self, ctx, command), fields(command = %command.name()))]
    pub async fn execute_typed<P>(&self, ctx: &CallContext, command: &Command) -> Result<P>
    where
        P: DeserializeOwned,
    {
        self.execute_with(ctx, command, |envelope| decode_payload(&envelope)).await
    }

    async fn execute_with<R, F>(&self, ctx: &CallContext, command: &Command, extract: F) -> Result<R>
    where
        F: Fn(Envelope) -> std::result::Result<R, ClassifiedError>,
    {
        let extract = &extract;
        let outcome = self
            .breaker
            .execute_classified(
                || {
                    self.retry.execute(ctx, move |attempt| {
                        self.attempt(ctx, command, attempt, extract)
                    })
                },
                |result| judge_call(result),
            )
            .await;

        outcome.map_err(|error| {
            let error = translate(error);
            debug!(error = %error, "Registrar command failed");
            error
        })
    }

    async fn attempt<R, F>(
        &self,
        ctx: &CallContext,
        command: &Command,
        attempt: u32,
        extract: &F,
    ) -> std::result::Result<R, ClassifiedError>
    where
        F: Fn(Envelope) -> std::result::Result<R, ClassifiedError>,
    {
        self.limiter.acquire(ctx).await?;

        let request = encode(command, &self.credentials, &self.endpoint);
        debug!(attempt = attempt + 1, "Sending registrar request");

        let exchange = tokio::time::timeout(self.attempt_timeout, self.transport.exchange(&request));
        let response = match ctx.run(exchange).await? {
            Ok(result) => result?,
            Err(_) => {
                warn!(attempt = attempt + 1, timeout = ?self.attempt_timeout, "Attempt timed out");
                return Err(ClassifiedError::transient(format!(
                    "attempt timed out after {:?}",
                    self.attempt_timeout
                )));
            }
        };

        let envelope = decode(&response.body, response.status)
            .map_err(|error| error.with_retry_after(response.retry_after))?;
        extract(envelope)
    }
}

fn translate(error: BreakerError<RetryError<ClassifiedError>>) -> RegistrarError {
    match error {
        BreakerError::Open { consecutive_failures, since_last_failure } => {
            RegistrarError::CircuitOpen {
                consecutive_failures,
                since_last_failure_ms: u64::try_from(since_last_failure.as_millis())
                    .unwrap_or(u64::MAX),
            }
        }
        BreakerError::Operation(error) => {
            let attempts = error.attempts();
            match error.into_inner() {
                Some(last) => last.into_registrar(attempts),
                // Only an interrupted retry loop has no operation error.
                None => RegistrarError::Canceled,
            }
        }
    }
}
