//! Account balance, TLD catalogue and pricing records

use std::fmt;

use serde::{Deserialize, Serialize};

/// Account funds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub available_balance: f64,
    pub account_balance: f64,
    pub earned_amount: f64,
    pub withdrawable_amount: f64,
    pub funds_required_for_auto_renew: f64,
}

/// Top-level domain as offered by the registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tld {
    pub name: String,
    pub non_real_time: bool,
    pub min_register_years: u32,
    pub max_register_years: u32,
    pub min_renew_years: u32,
    pub max_renew_years: u32,
    pub min_transfer_years: u32,
    pub max_transfer_years: u32,
    pub is_api_registerable: bool,
    pub is_api_renewable: bool,
    pub is_api_transferable: bool,
    pub is_epp_required: bool,
    pub tld_type: String,
    pub category: String,
}

/// Operation to check TLD support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TldOperation {
    Register,
    Renew,
    Transfer,
}

impl Tld {
    pub fn supports(&self, operation: TldOperation) -> bool {
        match operation {
            TldOperation::Register => self.is_api_registerable,
            TldOperation::Renew => self.is_api_renewable,
            TldOperation::Transfer => self.is_api_transferable,
        }
    }
}

/// Product families the pricing endpoint understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    Domain,
    SslCertificate,
    WhoisGuard,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "DOMAIN",
            Self::SslCertificate => "SSLCERTIFICATE",
            Self::WhoisGuard => "WHOISGUARD",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One price point for a product, action and duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingEntry {
    /// Category the entry belongs to, e.g. `register` or `renew`
    pub category: String,
    /// Product within the category, e.g. `com` or `positivessl`
    pub product: String,
    pub duration: u32,
    pub duration_type: String,
    pub price: f64,
    pub regular_price: f64,
    pub your_price: f64,
    pub currency: String,
    pub additional_cost: f64,
}
