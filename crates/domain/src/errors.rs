//! Error types returned to callers of the registrar client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a reconciliation loop should do with a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Try again later; the condition is expected to clear on its own.
    Requeue,
    /// Retrying the same request will not help.
    Terminal,
    /// Needs a human: broken protocol, bad configuration or an aborted call.
    Alert,
}

/// Main error type for registrar operations
///
/// Every failed call produces exactly one of these. Provider error codes and
/// messages are carried verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum RegistrarError {
    #[error("Rate limit exceeded: no request slot before the caller deadline")]
    RateLimitExceeded,

    #[error(
        "Circuit open after {consecutive_failures} consecutive failures \
         (last failure {since_last_failure_ms}ms ago)"
    )]
    CircuitOpen { consecutive_failures: u32, since_last_failure_ms: u64 },

    #[error("Transient failure after {attempts} attempts: {cause}")]
    Transient { attempts: u32, cause: String },

    #[error("Registrar rejected request with code {code}: {message}")]
    RemoteRejected { code: String, message: String, attempts: u32 },

    #[error("Not found ({code}): {message}")]
    NotFound { code: String, message: String },

    #[error("Protocol error: {detail}")]
    ProtocolError { detail: String },

    #[error("Operation canceled by caller")]
    Canceled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{command} reported failure: {reason}")]
    OperationFailed { command: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistrarError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::RateLimitExceeded | Self::CircuitOpen { .. } | Self::Transient { .. } => {
                Disposition::Requeue
            }
            Self::RemoteRejected { .. }
            | Self::NotFound { .. }
            | Self::InvalidInput(_)
            | Self::OperationFailed { .. } => Disposition::Terminal,
            Self::ProtocolError { .. } | Self::Canceled | Self::Config(_) => Disposition::Alert,
        }
    }

    /// Whether re-issuing the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.disposition() == Disposition::Requeue
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Provider error code, when the registrar supplied one.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            Self::RemoteRejected { code, .. } | Self::NotFound { code, .. } => Some(code),
            _ => None,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Result type alias for registrar operations
pub type Result<T> = std::result::Result<T, RegistrarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispositions() {
        assert_eq!(RegistrarError::RateLimitExceeded.disposition(), Disposition::Requeue);
        assert_eq!(
            RegistrarError::CircuitOpen { consecutive_failures: 5, since_last_failure_ms: 10 }
                .disposition(),
            Disposition::Requeue
        );
        assert_eq!(
            RegistrarError::Transient { attempts: 4, cause: "HTTP 503".into() }.disposition(),
            Disposition::Requeue
        );
        assert_eq!(
            RegistrarError::RemoteRejected {
                code: "2011166".into(),
                message: "invalid".into(),
                attempts: 1
            }
            .disposition(),
            Disposition::Terminal
        );
        assert_eq!(RegistrarError::invalid("no dot").disposition(), Disposition::Terminal);
        assert_eq!(
            RegistrarError::ProtocolError { detail: "bad xml".into() }.disposition(),
            Disposition::Alert
        );
        assert_eq!(RegistrarError::Canceled.disposition(), Disposition::Alert);
    }

    #[test]
    fn test_retryable_matches_requeue() {
        assert!(RegistrarError::RateLimitExceeded.is_retryable());
        assert!(!RegistrarError::Canceled.is_retryable());
        assert!(!RegistrarError::Config("missing key".into()).is_retryable());
    }

    #[test]
    fn test_provider_code_is_verbatim() {
        let err = RegistrarError::NotFound {
            code: "2019166".into(),
            message: "Domain not found".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.provider_code(), Some("2019166"));
        assert_eq!(err.to_string(), "Not found (2019166): Domain not found");
        assert_eq!(RegistrarError::Canceled.provider_code(), None);
    }

    /// Validates the tagged wire shape used when errors are reported to
    /// other processes.
    #[test]
    fn test_error_serialization_shape() {
        let err = RegistrarError::Transient { attempts: 3, cause: "HTTP 429".into() };
        let json = serde_json::to_value(&err).expect("serializes");

        assert_eq!(json["type"], "Transient");
        assert_eq!(json["details"]["attempts"], 3);

        let back: RegistrarError = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, err);
    }
}
