//! Records returned by registrar operations
//!
//! These are the caller-facing shapes. The XML wire structs that produce them
//! live next to the operations in the infra crate.

pub mod account;
pub mod dns;
pub mod domain;
pub mod ssl;
pub mod whoisguard;

use chrono::NaiveDate;

pub use account::{Balance, PricingEntry, ProductType, Tld, TldOperation};
pub use dns::{HostRecord, RecordType};
pub use domain::{DnsDetails, Domain, DomainInfo, DomainName, DomainRegistration, DomainRenewal};
pub use ssl::{ActivationRequest, Certificate, CertificateDetails, CertificateOrder};
pub use whoisguard::{WhoisGuard, WhoisGuardRenewal, WhoisGuardStatus};

/// Parse the `MM/DD/YYYY` dates the registrar returns.
///
/// Returns `None` for empty or unrecognised values; the raw string is always
/// kept on the record.
pub fn parse_registrar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registrar_dates() {
        assert_eq!(parse_registrar_date("06/04/2026"), NaiveDate::from_ymd_opt(2026, 6, 4));
        assert_eq!(parse_registrar_date("2026-06-04"), NaiveDate::from_ymd_opt(2026, 6, 4));
        assert_eq!(parse_registrar_date(""), None);
        assert_eq!(parse_registrar_date("soon"), None);
    }
}
