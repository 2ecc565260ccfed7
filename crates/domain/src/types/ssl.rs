//! SSL certificate records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::parse_registrar_date;

/// Entry from the account's certificate list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub certificate_id: u64,
    /// Common name the certificate was issued for; empty until activated
    pub host_name: String,
    pub ssl_type: String,
    pub purchase_date: String,
    pub expire_date: String,
    pub activation_expire_date: String,
    pub is_expired: bool,
    pub status: String,
    pub years: u32,
}

impl Certificate {
    pub fn expires_on(&self) -> Option<NaiveDate> {
        parse_registrar_date(&self.expire_date)
    }

    /// True when the certificate covers `domain` exactly or one of its
    /// sub-domains (case-insensitive).
    pub fn covers(&self, domain: &str) -> bool {
        let host = self.host_name.trim_start_matches("*.").to_ascii_lowercase();
        let domain = domain.trim().to_ascii_lowercase();
        if host.is_empty() || domain.is_empty() {
            return false;
        }
        host == domain || host.ends_with(&format!(".{domain}"))
    }
}

/// Result of purchasing a certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateOrder {
    pub certificate_id: u64,
    pub order_id: u64,
    pub transaction_id: u64,
    pub charged_amount: f64,
}

/// Detailed view of a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDetails {
    pub certificate_id: u64,
    pub host_name: String,
    pub ssl_type: String,
    pub status: String,
    pub status_description: String,
    pub expire_date: String,
    pub years: u32,
    pub provider: String,
    pub approver_emails: Vec<String>,
}

/// Parameters for activating a purchased certificate
///
/// Domain control is proven by approver email unless HTTP or DNS validation
/// is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub certificate_id: u64,
    pub csr: String,
    pub domain_name: String,
    pub approver_email: String,
    pub http_validation: bool,
    pub dns_validation: bool,
    pub web_server_type: Option<String>,
}

impl ActivationRequest {
    pub fn new(
        certificate_id: u64,
        csr: impl Into<String>,
        domain_name: impl Into<String>,
        approver_email: impl Into<String>,
    ) -> Self {
        Self {
            certificate_id,
            csr: csr.into(),
            domain_name: domain_name.into(),
            approver_email: approver_email.into(),
            ..Self::default()
        }
    }
}
