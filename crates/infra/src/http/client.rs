use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use registrar_domain::constants::{DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Url};
use thiserror::Error;
use tracing::debug;

const REDACTED: &str = "***";

/// A GET request described by its base URL and ordered query parameters.
///
/// Parameters listed with [`WireRequest::redact`] are masked in `Debug`
/// output and in [`WireRequest::loggable_url`].
#[derive(Clone, PartialEq, Eq)]
pub struct WireRequest {
    url: String,
    query: Vec<(String, String)>,
    redacted: Vec<&'static str>,
}

impl WireRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), query: Vec::new(), redacted: Vec::new() }
    }

    /// Append a query parameter. Order of insertion is preserved on the wire.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Mask the value of `key` whenever the request is logged.
    #[must_use]
    pub fn redact(mut self, key: &'static str) -> Self {
        if !self.redacted.contains(&key) {
            self.redacted.push(key);
        }
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value sent for `key`, compared exactly.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn is_redacted(&self, key: &str) -> bool {
        self.redacted.iter().any(|redacted| redacted.eq_ignore_ascii_case(key))
    }

    fn masked_query(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.query.iter().map(|(key, value)| {
            let value = if self.is_redacted(key) { REDACTED } else { value.as_str() };
            (key.as_str(), value)
        })
    }

    /// Full URL with redacted parameters masked.
    pub fn loggable_url(&self) -> String {
        match Url::parse_with_params(&self.url, self.masked_query()) {
            Ok(url) => url.to_string(),
            Err(_) => self.url.clone(),
        }
    }
}

impl fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query: Vec<(&str, &str)> = self.masked_query().collect();
        f.debug_struct("WireRequest").field("url", &self.url).field("query", &query).finish()
    }
}

/// Status and body of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// `Retry-After` in delta-seconds form; HTTP dates are ignored.
    pub retry_after: Option<Duration>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into(), retry_after: None }
    }

    #[must_use]
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Why an exchange produced no response.
///
/// Messages never contain the request URL, which carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("http client error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether another attempt might get through.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else if err.is_request() {
            Self::Request(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Performs one request/response exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: &WireRequest) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn exchange(&self, request: &WireRequest) -> Result<RawResponse, TransportError> {
        (**self).exchange(request).await
    }
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, request: &WireRequest) -> Result<RawResponse, TransportError> {
        debug!(url = %request.loggable_url(), "sending HTTP request");

        let response = self.client.get(request.url()).query(request.query()).send().await?;
        let status = response.status().as_u16();
        let retry_after = retry_after(response.headers());
        debug!(status, ?retry_after, "received HTTP response");

        let body = response.text().await?;
        Ok(RawResponse { status, body, retry_after })
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    user_agent: String,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpTransportBuilder {
    /// Upper bound for a single exchange, connect through body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn build(self) -> Result<HttpTransport, TransportError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()?;
        Ok(HttpTransport { client })
    }
}
