//! Account balance, TLD catalogue and pricing

use registrar_common::resilience::{CallContext, Clock};
use registrar_domain::{
    Balance, PricingEntry, ProductType, RegistrarError, Result, Tld, TldOperation,
};
use serde::Deserialize;
use tracing::debug;

use super::client::{not_found, NamecheapClient};
use super::command::{names, Command};
use super::wire::{amount, flag, optional_number};
use crate::http::Transport;

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(rename = "UserGetBalancesResult")]
    result: WireBalance,
}

#[derive(Debug, Deserialize)]
struct WireBalance {
    #[serde(rename = "@Currency", default)]
    currency: String,
    #[serde(rename = "@AvailableBalance", default, deserialize_with = "amount")]
    available_balance: f64,
    #[serde(rename = "@AccountBalance", default, deserialize_with = "amount")]
    account_balance: f64,
    #[serde(rename = "@EarnedAmount", default, deserialize_with = "amount")]
    earned_amount: f64,
    #[serde(rename = "@WithdrawableAmount", default, deserialize_with = "amount")]
    withdrawable_amount: f64,
    #[serde(rename = "@FundsRequiredForAutoRenew", default, deserialize_with = "amount")]
    funds_required_for_auto_renew: f64,
}

impl From<WireBalance> for Balance {
    fn from(wire: WireBalance) -> Self {
        Self {
            currency: wire.currency,
            available_balance: wire.available_balance,
            account_balance: wire.account_balance,
            earned_amount: wire.earned_amount,
            withdrawable_amount: wire.withdrawable_amount,
            funds_required_for_auto_renew: wire.funds_required_for_auto_renew,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TldListResponse {
    #[serde(rename = "DomainsGetTldListResult", alias = "Tlds")]
    result: TldList,
}

#[derive(Debug, Deserialize)]
struct TldList {
    #[serde(rename = "Tld", default)]
    tlds: Vec<WireTld>,
}

#[derive(Debug, Deserialize)]
struct WireTld {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@NonRealTime", default, deserialize_with = "flag")]
    non_real_time: bool,
    #[serde(rename = "@MinRegisterYears", default, deserialize_with = "optional_number")]
    min_register_years: Option<u32>,
    #[serde(rename = "@MaxRegisterYears", default, deserialize_with = "optional_number")]
    max_register_years: Option<u32>,
    #[serde(rename = "@MinRenewYears", default, deserialize_with = "optional_number")]
    min_renew_years: Option<u32>,
    #[serde(rename = "@MaxRenewYears", default, deserialize_with = "optional_number")]
    max_renew_years: Option<u32>,
    #[serde(rename = "@MinTransferYears", default, deserialize_with = "optional_number")]
    min_transfer_years: Option<u32>,
    #[serde(rename = "@MaxTransferYears", default, deserialize_with = "optional_number")]
    max_transfer_years: Option<u32>,
    #[serde(rename = "@IsApiRegisterable", default, deserialize_with = "flag")]
    is_api_registerable: bool,
    #[serde(rename = "@IsApiRenewable", default, deserialize_with = "flag")]
    is_api_renewable: bool,
    #[serde(rename = "@IsApiTransferable", default, deserialize_with = "flag")]
    is_api_transferable: bool,
    #[serde(rename = "@IsEppRequired", default, deserialize_with = "flag")]
    is_epp_required: bool,
    #[serde(rename = "@Type", default)]
    tld_type: String,
    #[serde(rename = "@Category", default)]
    category: String,
}

impl From<WireTld> for Tld {
    fn from(wire: WireTld) -> Self {
        Self {
            name: wire.name,
            non_real_time: wire.non_real_time,
            min_register_years: wire.min_register_years.unwrap_or_default(),
            max_register_years: wire.max_register_years.unwrap_or_default(),
            min_renew_years: wire.min_renew_years.unwrap_or_default(),
            max_renew_years: wire.max_renew_years.unwrap_or_default(),
            min_transfer_years: wire.min_transfer_years.unwrap_or_default(),
            max_transfer_years: wire.max_transfer_years.unwrap_or_default(),
            is_api_registerable: wire.is_api_registerable,
            is_api_renewable: wire.is_api_renewable,
            is_api_transferable: wire.is_api_transferable,
            is_epp_required: wire.is_epp_required,
            tld_type: wire.tld_type,
            category: wire.category,
        }
    }
}

// Pricing nests ProductType > ProductCategory > Product > Price.

#[derive(Debug, Deserialize)]
struct PricingResponse {
    #[serde(rename = "UserGetPricingResult")]
    result: WirePricing,
}

#[derive(Debug, Deserialize)]
struct WirePricing {
    #[serde(rename = "ProductType", default)]
    product_types: Vec<WireProductType>,
}

#[derive(Debug, Deserialize)]
struct WireProductType {
    #[serde(rename = "ProductCategory", default)]
    categories: Vec<WireCategory>,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    #[serde(rename = "@Name", default)]
    name: String,
    #[serde(rename = "Product", default)]
    products: Vec<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct WireProduct {
    #[serde(rename = "@Name", default)]
    name: String,
    #[serde(rename = "Price", default)]
    prices: Vec<WirePrice>,
}

#[derive(Debug, Deserialize)]
struct WirePrice {
    #[serde(rename = "@Duration", default, deserialize_with = "optional_number")]
    duration: Option<u32>,
    #[serde(rename = "@DurationType", default)]
    duration_type: String,
    #[serde(rename = "@Price", default, deserialize_with = "amount")]
    price: f64,
    #[serde(rename = "@RegularPrice", default, deserialize_with = "amount")]
    regular_price: f64,
    #[serde(rename = "@YourPrice", default, deserialize_with = "amount")]
    your_price: f64,
    #[serde(rename = "@Currency", default)]
    currency: String,
    #[serde(rename = "@AdditionalCost", default, deserialize_with = "amount")]
    additional_cost: f64,
}

impl WirePricing {
    fn flatten(self) -> Vec<PricingEntry> {
        let mut entries = Vec::new();
        for category in self.product_types.into_iter().flat_map(|product_type| product_type.categories) {
            for product in category.products {
                for price in product.prices {
                    entries.push(PricingEntry {
                        category: category.name.clone(),
                        product: product.name.clone(),
                        duration: price.duration.unwrap_or_default(),
                        duration_type: price.duration_type,
                        price: price.price,
                        regular_price: price.regular_price,
                        your_price: price.your_price,
                        currency: price.currency,
                        additional_cost: price.additional_cost,
                    });
                }
            }
        }
        entries
    }
}

fn normalize_tld(name: &str) -> &str {
    name.trim().trim_start_matches('.')
}

fn pricing_command(
    product_type: ProductType,
    category: Option<&str>,
    action: Option<&str>,
) -> Command {
    let mut command = Command::new(names::USERS_GET_PRICING).param("ProductType", product_type);
    if let Some(category) = category.map(str::trim).filter(|value| !value.is_empty()) {
        command.set("ProductCategory", category);
    }
    if let Some(action) = action.map(str::trim).filter(|value| !value.is_empty()) {
        command.set("ActionName", action.to_ascii_uppercase());
    }
    command
}

impl<T: Transport, C: Clock> NamecheapClient<T, C> {
    pub async fn get_balances(&self, ctx: &CallContext) -> Result<Balance> {
        let command = Command::new(names::USERS_GET_BALANCES);
        let response: BalancesResponse = self.pipeline().execute_typed(ctx, &command).await?;
        Ok(response.result.into())
    }

    /// Whether the available balance covers `amount`.
    ///
    /// # Errors
    /// `InvalidInput` for a negative or non-finite amount.
    pub async fn has_sufficient_balance(&self, ctx: &CallContext, amount: f64) -> Result<bool> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(RegistrarError::InvalidInput(format!(
                "amount must be a non-negative number, got {amount}"
            )));
        }
        let balance = self.get_balances(ctx).await?;
        Ok(balance.available_balance >= amount)
    }

    pub async fn list_tlds(&self, ctx: &CallContext) -> Result<Vec<Tld>> {
        let command = Command::new(names::DOMAINS_GET_TLD_LIST);
        let response: TldListResponse = self.pipeline().execute_typed(ctx, &command).await?;
        let tlds: Vec<Tld> = response.result.tlds.into_iter().map(Tld::from).collect();
        debug!(count = tlds.len(), "Fetched TLD catalogue");
        Ok(tlds)
    }

    /// Look up a TLD by name. A leading dot is ignored and names compare
    /// case-insensitively.
    ///
    /// # Errors
    /// `NotFound` when the registrar does not offer the TLD.
    pub async fn get_tld(&self, ctx: &CallContext, name: &str) -> Result<Tld> {
        let wanted = normalize_tld(name);
        if wanted.is_empty() {
            return Err(RegistrarError::InvalidInput("TLD name must not be empty".to_string()));
        }
        self.list_tlds(ctx)
            .await?
            .into_iter()
            .find(|tld| normalize_tld(&tld.name).eq_ignore_ascii_case(wanted))
            .ok_or_else(|| not_found(format!("TLD {wanted} is not offered")))
    }

    /// `false` for TLDs the registrar does not offer at all.
    pub async fn is_tld_supported(
        &self,
        ctx: &CallContext,
        name: &str,
        operation: TldOperation,
    ) -> Result<bool> {
        match self.get_tld(ctx, name).await {
            Ok(tld) => Ok(tld.supports(operation)),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Price list for `product_type`, optionally narrowed to a category
    /// (`register`, `renew`, ...) and an action.
    pub async fn get_pricing(
        &self,
        ctx: &CallContext,
        product_type: ProductType,
        category: Option<&str>,
        action: Option<&str>,
    ) -> Result<Vec<PricingEntry>> {
        let command = pricing_command(product_type, category, action);
        let response: PricingResponse = self.pipeline().execute_typed(ctx, &command).await?;
        Ok(response.result.flatten())
    }

    pub async fn domain_pricing(&self, ctx: &CallContext, action: &str) -> Result<Vec<PricingEntry>> {
        self.get_pricing(ctx, ProductType::Domain, None, Some(action)).await
    }

    pub async fn ssl_pricing(&self, ctx: &CallContext, action: &str) -> Result<Vec<PricingEntry>> {
        self.get_pricing(ctx, ProductType::SslCertificate, None, Some(action)).await
    }

    pub async fn whoisguard_pricing(&self, ctx: &CallContext, action: &str) -> Result<Vec<PricingEntry>> {
        self.get_pricing(ctx, ProductType::WhoisGuard, None, Some(action)).await
    }
}
