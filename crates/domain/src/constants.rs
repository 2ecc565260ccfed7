//! Registrar constants
//!
//! Endpoints and the conservative defaults used when configuration leaves a
//! value unset.

/// Production XML API endpoint
pub const PRODUCTION_ENDPOINT: &str = "https://api.namecheap.com/xml.response";
/// Sandbox XML API endpoint
pub const SANDBOX_ENDPOINT: &str = "https://api.sandbox.namecheap.com/xml.response";

pub const DEFAULT_USER_AGENT: &str = concat!("registrar-client/", env!("CARGO_PKG_VERSION"));

// Rate limiting
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 2.0;
pub const DEFAULT_BURST: u32 = 5;
/// One request every 1000 seconds; anything slower is a misconfiguration.
pub const MIN_REQUESTS_PER_SECOND: f64 = 1e-3;

// Circuit breaker
pub const DEFAULT_MAX_FAILURES: u32 = 5;
pub const DEFAULT_RESET_TIMEOUT_SECS: u64 = 30;

// Retry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const DEFAULT_JITTER_FRACTION: f64 = 0.1;

// HTTP
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Page size requested when listing domains
pub const DOMAIN_LIST_PAGE_SIZE: u32 = 100;
