//! DNS host records

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Host record type as the registrar spells it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Alias,
    Caa,
    Cname,
    Mx,
    Mxe,
    Ns,
    Txt,
    Url,
    Url301,
    Frame,
    /// Anything this client does not know by name, kept verbatim
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Alias => "ALIAS",
            Self::Caa => "CAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Mxe => "MXE",
            Self::Ns => "NS",
            Self::Txt => "TXT",
            Self::Url => "URL",
            Self::Url301 => "URL301",
            Self::Frame => "FRAME",
            Self::Other(value) => value,
        }
    }
}

impl FromStr for RecordType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "AAAA" => Self::Aaaa,
            "ALIAS" => Self::Alias,
            "CAA" => Self::Caa,
            "CNAME" => Self::Cname,
            "MX" => Self::Mx,
            "MXE" => Self::Mxe,
            "NS" => Self::Ns,
            "TXT" => Self::Txt,
            "URL" => Self::Url,
            "URL301" => Self::Url301,
            "FRAME" => Self::Frame,
            _ => Self::Other(value.trim().to_string()),
        })
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(record_type) => record_type,
            Err(never) => match never {},
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a domain's host set
///
/// Records are identified by `(name, record_type)`; names compare
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Registrar-assigned id; absent on records not yet written
    pub host_id: Option<u64>,
    /// Host label, `@` for the apex
    pub name: String,
    pub record_type: RecordType,
    pub address: String,
    /// Only meaningful for MX records
    pub mx_pref: Option<u32>,
    /// Seconds; the registrar default applies when absent
    pub ttl: Option<u32>,
    pub is_active: bool,
}

impl HostRecord {
    pub fn new(name: impl Into<String>, record_type: RecordType, address: impl Into<String>) -> Self {
        Self {
            host_id: None,
            name: name.into(),
            record_type,
            address: address.into(),
            mx_pref: None,
            ttl: None,
            is_active: true,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_mx_pref(mut self, preference: u32) -> Self {
        self.mx_pref = Some(preference);
        self
    }

    pub fn matches(&self, name: &str, record_type: &RecordType) -> bool {
        self.name.eq_ignore_ascii_case(name) && &self.record_type == record_type
    }
}
