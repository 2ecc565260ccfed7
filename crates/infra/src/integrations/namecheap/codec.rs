//! Request encoding and response decoding for the registrar XML API
//!
//! Requests are GETs whose query string carries the credentials, the command
//! name and the command parameters. Responses are wrapped in an
//! `ApiResponse` envelope:
//!
//! ```xml
//! <ApiResponse Status="ERROR">
//!   <Errors><Error Number="2019166">Domain not found</Error></Errors>
//!   <CommandResponse />
//! </ApiResponse>
//! ```
//!
//! Decoding turns every response into either an OK [`Envelope`] or exactly
//! one [`ClassifiedError`].

use registrar_domain::Credentials;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use super::command::Command;
use super::errors::ClassifiedError;
use crate::http::WireRequest;

/// Query parameters owned by the codec. Command parameters with these names
/// (compared case-insensitively) are dropped.
pub const RESERVED_PARAMS: [&str; 5] = ["ApiUser", "ApiKey", "UserName", "ClientIp", "Command"];

/// Provider error codes with special handling.
pub mod codes {
    /// Too many requests
    pub const RATE_LIMITED: [&str; 2] = ["2030280", "2030281"];
    /// Service temporarily unavailable
    pub const TEMPORARILY_UNAVAILABLE: &str = "2011170";
    /// Domain not found
    pub const DOMAIN_NOT_FOUND: &str = "2019166";
    /// Domain is not associated with the account
    pub const DOMAIN_NOT_ASSOCIATED: &str = "2016166";
}

/// Build the wire request for `command`.
pub fn encode(command: &Command, credentials: &Credentials, endpoint: &str) -> WireRequest {
    let mut request = WireRequest::new(endpoint)
        .param("ApiUser", &credentials.api_user)
        .param("ApiKey", &credentials.api_key)
        .param("UserName", &credentials.username)
        .param("ClientIp", &credentials.client_ip)
        .param("Command", command.name())
        .redact("ApiKey");

    for (key, value) in command.params() {
        if RESERVED_PARAMS.iter().any(|reserved| reserved.eq_ignore_ascii_case(key)) {
            warn!(command = %command, param = %key, "Dropping parameter that shadows a reserved field");
            continue;
        }
        request.push(key.clone(), value.clone());
    }
    request
}

/// One error entry from the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

/// A decoded `Status="OK"` response.
///
/// The command payload stays undecoded until [`decode_payload`] is asked for
/// a concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    requested_command: Option<String>,
    warnings: Vec<ProviderError>,
    raw: String,
}

impl Envelope {
    /// Command name echoed by the registrar, when present.
    pub fn requested_command(&self) -> Option<&str> {
        self.requested_command.as_deref()
    }

    pub fn warnings(&self) -> &[ProviderError] {
        &self.warnings
    }

    /// Response body as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decode the `CommandResponse` element into `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ClassifiedError> {
        decode_payload(self)
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "@Status", default)]
    status: Option<String>,
    #[serde(rename = "Errors", default)]
    errors: Option<RawErrorList>,
    #[serde(rename = "Warnings", default)]
    warnings: Option<RawWarningList>,
    #[serde(rename = "RequestedCommand", default)]
    requested_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawErrorList {
    #[serde(rename = "Error", default)]
    entries: Vec<RawProviderError>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWarningList {
    #[serde(rename = "Warning", default)]
    entries: Vec<RawProviderError>,
}

#[derive(Debug, Deserialize)]
struct RawProviderError {
    #[serde(rename = "@Number", default)]
    number: String,
    #[serde(rename = "$text", default)]
    message: String,
}

impl From<RawProviderError> for ProviderError {
    fn from(raw: RawProviderError) -> Self {
        Self { code: raw.number.trim().to_string(), message: raw.message.trim().to_string() }
    }
}

fn convert(entries: Vec<RawProviderError>) -> Vec<ProviderError> {
    entries.into_iter().map(ProviderError::from).collect()
}

/// Classify a provider error code.
pub fn classify(error: ProviderError) -> ClassifiedError {
    let ProviderError { code, message } = error;
    let code_str = code.as_str();
    if codes::RATE_LIMITED.contains(&code_str) {
        ClassifiedError::rate_limited(format!("{code}: {message}"))
    } else if code_str == codes::TEMPORARILY_UNAVAILABLE {
        ClassifiedError::Transient { reason: format!("{code}: {message}") }
    } else if code_str == codes::DOMAIN_NOT_FOUND || code_str == codes::DOMAIN_NOT_ASSOCIATED {
        ClassifiedError::NotFound { code, message }
    } else {
        ClassifiedError::Fatal { code, message }
    }
}

/// Decode one HTTP response.
///
/// Rate limiting (429) and server errors (5xx) are classified from the status
/// alone; the body is not parsed.
pub fn decode(body: &str, http_status: u16) -> Result<Envelope, ClassifiedError> {
    if http_status == 429 {
        return Err(ClassifiedError::rate_limited("HTTP 429"));
    }
    if http_status >= 500 {
        return Err(ClassifiedError::Transient { reason: format!("HTTP {http_status}") });
    }
    if !(200..300).contains(&http_status) {
        return Err(ClassifiedError::Fatal {
            code: format!("HTTP{http_status}"),
            message: format!("unexpected HTTP status {http_status}"),
        });
    }

    let raw: RawEnvelope = quick_xml::de::from_str(body)
        .map_err(|err| ClassifiedError::malformed(format!("invalid response envelope: {err}")))?;

    let status = raw
        .status
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| ClassifiedError::malformed("response envelope has no Status"))?;

    if status.eq_ignore_ascii_case("OK") {
        Ok(Envelope {
            requested_command: raw.requested_command.map(|c| c.trim().to_string()),
            warnings: raw.warnings.map(|list| convert(list.entries)).unwrap_or_default(),
            raw: body.to_string(),
        })
    } else if status.eq_ignore_ascii_case("ERROR") {
        let first = raw
            .errors
            .map(|list| convert(list.entries))
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ClassifiedError::malformed("ERROR response without error entries"))?;
        Err(classify(first))
    } else {
        Err(ClassifiedError::malformed(format!("unknown response status {status:?}")))
    }
}

#[derive(Deserialize)]
struct TypedEnvelope<T> {
    #[serde(rename = "CommandResponse", default = "Option::default")]
    response: Option<T>,
}

/// Decode the envelope's `CommandResponse` into `T`.
pub fn decode_payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, ClassifiedError> {
    let typed: TypedEnvelope<T> = quick_xml::de::from_str(&envelope.raw)
        .map_err(|err| ClassifiedError::malformed(format!("invalid command response: {err}")))?;
    typed.response.ok_or_else(|| ClassifiedError::malformed("response has no CommandResponse"))
}
