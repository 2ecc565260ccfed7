//! WhoisGuard privacy protection records

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum WhoisGuardStatus {
    Enabled,
    Disabled,
    NotPresent,
    Other(String),
}

impl WhoisGuardStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::NotPresent => "NOTPRESENT",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for WhoisGuardStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ENABLED" => Self::Enabled,
            "DISABLED" => Self::Disabled,
            "NOTPRESENT" => Self::NotPresent,
            _ => Self::Other(value),
        }
    }
}

impl From<WhoisGuardStatus> for String {
    fn from(value: WhoisGuardStatus) -> Self {
        value.as_str().to_string()
    }
}

/// A WhoisGuard subscription and the domain it is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisGuard {
    pub id: u64,
    /// Empty when the subscription is not allotted to a domain
    pub domain_name: String,
    pub created: String,
    pub expires: String,
    pub status: WhoisGuardStatus,
    pub forwarded_to: Option<String>,
}

impl WhoisGuard {
    pub fn is_enabled(&self) -> bool {
        self.status == WhoisGuardStatus::Enabled
    }
}

/// Result of renewing a WhoisGuard subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoisGuardRenewal {
    pub id: u64,
    pub renewed: bool,
    pub charged_amount: f64,
    pub order_id: u64,
    pub transaction_id: u64,
}
