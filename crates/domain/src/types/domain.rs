//! Domain registration records

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::parse_registrar_date;
use crate::errors::{RegistrarError, Result};

/// A fully qualified name split the way the registrar addresses it: the
/// second-level label and everything after it.
///
/// `shop.example.co.uk` becomes SLD `shop` and TLD `example.co.uk`; the split
/// is always at the first dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainName {
    sld: String,
    tld: String,
}

impl DomainName {
    /// # Errors
    /// `InvalidInput` when the name has no dot or an empty label on either
    /// side of it.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim().trim_end_matches('.');
        let (sld, tld) = name
            .split_once('.')
            .ok_or_else(|| RegistrarError::invalid(format!("domain name {name:?} has no TLD")))?;
        if sld.is_empty() || tld.is_empty() {
            return Err(RegistrarError::invalid(format!("domain name {name:?} is malformed")));
        }
        Ok(Self { sld: sld.to_string(), tld: tld.to_string() })
    }

    pub fn sld(&self) -> &str {
        &self.sld
    }

    pub fn tld(&self) -> &str {
        &self.tld
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sld, self.tld)
    }
}

/// Entry from the account's domain list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: u64,
    pub name: String,
    pub user: String,
    pub created: String,
    pub expires: String,
    pub is_expired: bool,
    pub is_locked: bool,
    pub auto_renew: bool,
    /// WhoisGuard state as reported in the list (`ENABLED`, `NOTPRESENT`, ...)
    pub whois_guard: String,
    pub is_premium: bool,
    pub is_our_dns: bool,
}

impl Domain {
    pub fn expires_on(&self) -> Option<NaiveDate> {
        parse_registrar_date(&self.expires)
    }
}

/// DNS provider settings for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsDetails {
    /// `FREE`, `CUSTOM`, ...
    pub provider_type: String,
    pub is_using_our_dns: bool,
    pub nameservers: Vec<String>,
}

/// Detailed view of a single domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub id: u64,
    pub name: String,
    pub owner: String,
    pub status: String,
    pub is_premium: bool,
    pub created: String,
    pub expires: String,
    pub whoisguard_enabled: bool,
    pub dns: DnsDetails,
}

impl DomainInfo {
    pub fn expires_on(&self) -> Option<NaiveDate> {
        parse_registrar_date(&self.expires)
    }
}

/// Result of registering a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRegistration {
    pub domain: String,
    pub registered: bool,
    pub charged_amount: f64,
    pub domain_id: u64,
    pub order_id: u64,
    pub transaction_id: u64,
    pub whoisguard_enabled: bool,
    pub non_real_time: bool,
}

/// Result of renewing a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRenewal {
    pub domain: String,
    pub domain_id: u64,
    pub renewed: bool,
    pub charged_amount: f64,
    pub order_id: u64,
    pub transaction_id: u64,
    pub expires: String,
}
