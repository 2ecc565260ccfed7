//! Client configuration
//!
//! Every section has a `Default`, so a configuration file only needs the
//! credentials. Durations are stored as integer milliseconds or seconds and
//! exposed as [`Duration`] through accessor methods.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_BACKOFF_FACTOR, DEFAULT_BASE_DELAY_MS, DEFAULT_BURST,
    DEFAULT_JITTER_FRACTION, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_FAILURES,
    DEFAULT_REQUESTS_PER_SECOND, DEFAULT_RESET_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    MIN_REQUESTS_PER_SECOND, PRODUCTION_ENDPOINT, SANDBOX_ENDPOINT,
};
use crate::errors::{RegistrarError, Result};

/// API credentials sent with every request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_user: String,
    pub api_key: String,
    pub username: String,
    pub client_ip: String,
}

impl Credentials {
    pub fn new(
        api_user: impl Into<String>,
        api_key: impl Into<String>,
        username: impl Into<String>,
        client_ip: impl Into<String>,
    ) -> Self {
        Self {
            api_user: api_user.into(),
            api_key: api_key.into(),
            username: username.into(),
            client_ip: client_ip.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("api_user", &self.api_user),
            ("api_key", &self.api_key),
            ("username", &self.username),
            ("client_ip", &self.client_ip),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(RegistrarError::Config(format!("credentials.{name} is required")));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_user", &self.api_user)
            .field("api_key", &"<redacted>")
            .field("username", &self.username)
            .field("client_ip", &self.client_ip)
            .finish()
    }
}

/// Which API endpoint to talk to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub sandbox: bool,
    /// Overrides both well-known endpoints (used for tests and proxies).
    pub base_url: Option<String>,
}

impl EndpointConfig {
    pub fn url(&self) -> &str {
        match &self.base_url {
            Some(url) => url,
            None if self.sandbox => SANDBOX_ENDPOINT,
            None => PRODUCTION_ENDPOINT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_second: DEFAULT_REQUESTS_PER_SECOND, burst: DEFAULT_BURST }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub max_failures: u32,
    pub reset_timeout_secs: u64,
}

impl CircuitBreakerSettings {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_secs)
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self { max_failures: DEFAULT_MAX_FAILURES, reset_timeout_secs: DEFAULT_RESET_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    pub jitter_fraction: f64,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Upper bound for a single network exchange
    pub attempt_timeout_secs: u64,
    pub user_agent: String,
}

impl HttpSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub credentials: Credentials,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub http: HttpSettings,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials, ..Self::default() }
    }

    /// Check every section; the first problem found is reported.
    ///
    /// # Errors
    /// Returns `RegistrarError::Config` describing the offending field.
    pub fn validate(&self) -> Result<()> {
        self.credentials.validate()?;

        if let Some(url) = &self.endpoint.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RegistrarError::Config(format!(
                    "endpoint.base_url must be an http(s) URL, got {url:?}"
                )));
            }
        }

        let rate = self.rate_limit.requests_per_second;
        if !(rate.is_finite() && rate >= MIN_REQUESTS_PER_SECOND) {
            return Err(RegistrarError::Config(format!(
                "rate_limit.requests_per_second must be a finite number >= {MIN_REQUESTS_PER_SECOND}, got {rate}"
            )));
        }
        if self.rate_limit.burst == 0 {
            return Err(RegistrarError::Config("rate_limit.burst must be at least 1".to_string()));
        }

        if self.circuit_breaker.max_failures == 0 {
            return Err(RegistrarError::Config(
                "circuit_breaker.max_failures must be at least 1".to_string(),
            ));
        }
        if self.circuit_breaker.reset_timeout_secs == 0 {
            return Err(RegistrarError::Config(
                "circuit_breaker.reset_timeout_secs must be at least 1".to_string(),
            ));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(RegistrarError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(RegistrarError::Config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        if !(retry.backoff_factor.is_finite() && retry.backoff_factor >= 1.0) {
            return Err(RegistrarError::Config(
                "retry.backoff_factor must be at least 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&retry.jitter_fraction) {
            return Err(RegistrarError::Config(
                "retry.jitter_fraction must be within [0, 1]".to_string(),
            ));
        }

        if self.http.attempt_timeout_secs == 0 {
            return Err(RegistrarError::Config(
                "http.attempt_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
