//! WhoisGuard privacy protection

use registrar_common::resilience::{CallContext, Clock};
use registrar_domain::{Result, WhoisGuard, WhoisGuardRenewal, WhoisGuardStatus};
use serde::Deserialize;
use tracing::info;

use super::client::{not_found, operation_failed, require_non_empty, require_positive, NamecheapClient};
use super::command::{names, Command};
use super::wire::{amount, flag};
use crate::http::Transport;

#[derive(Debug, Deserialize)]
struct GetListResponse {
    #[serde(rename = "WhoisguardGetListResult")]
    result: WhoisGuardList,
}

#[derive(Debug, Deserialize)]
struct WhoisGuardList {
    #[serde(rename = "Whoisguard", default)]
    subscriptions: Vec<WireWhoisGuard>,
}

#[derive(Debug, Deserialize)]
struct WireWhoisGuard {
    #[serde(rename = "@ID")]
    id: u64,
    #[serde(rename = "@DomainName", default)]
    domain_name: String,
    #[serde(rename = "@Created", default)]
    created: String,
    #[serde(rename = "@Expires", default)]
    expires: String,
    #[serde(rename = "@Status", default)]
    status: String,
    #[serde(rename = "EmailDetails", default)]
    email_details: Option<WireEmailDetails>,
}

#[derive(Debug, Deserialize)]
struct WireEmailDetails {
    #[serde(rename = "@ForwardedTo", default)]
    forwarded_to: String,
}

impl From<WireWhoisGuard> for WhoisGuard {
    fn from(wire: WireWhoisGuard) -> Self {
        let forwarded_to = wire
            .email_details
            .map(|details| details.forwarded_to)
            .filter(|address| !address.trim().is_empty());
        Self {
            id: wire.id,
            domain_name: wire.domain_name,
            created: wire.created,
            expires: wire.expires,
            status: WhoisGuardStatus::from(wire.status),
            forwarded_to,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnableResponse {
    #[serde(rename = "WhoisguardEnableResult")]
    result: WireToggle,
}

#[derive(Debug, Deserialize)]
struct DisableResponse {
    #[serde(rename = "WhoisguardDisableResult")]
    result: WireToggle,
}

#[derive(Debug, Deserialize)]
struct WireToggle {
    #[serde(rename = "@IsSuccess", default, deserialize_with = "flag")]
    is_success: bool,
}

#[derive(Debug, Deserialize)]
struct RenewResponse {
    #[serde(rename = "WhoisguardRenewResult")]
    result: WireRenewal,
}

#[derive(Debug, Deserialize)]
struct WireRenewal {
    #[serde(rename = "@WhoisguardID", alias = "@WhoisguardId", default)]
    id: u64,
    #[serde(rename = "@Renew", default, deserialize_with = "flag")]
    renewed: bool,
    #[serde(rename = "@ChargedAmount", default, deserialize_with = "amount")]
    charged_amount: f64,
    #[serde(rename = "@OrderID", alias = "@OrderId", default)]
    order_id: u64,
    #[serde(rename = "@TransactionID", alias = "@TransactionId", default)]
    transaction_id: u64,
}

fn toggle_command(name: &str, id: u64, domain: &str) -> Result<Command> {
    require_non_empty("domain", domain)?;
    Ok(Command::new(name).param("WhoisguardID", id).param("DomainName", domain.trim()))
}

impl<T: Transport, C: Clock> NamecheapClient<T, C> {
    pub async fn list_whoisguards(&self, ctx: &CallContext) -> Result<Vec<WhoisGuard>> {
        let command = Command::new(names::WHOISGUARD_GET_LIST);
        let response: GetListResponse = self.pipeline().execute_typed(ctx, &command).await?;
        Ok(response.result.subscriptions.into_iter().map(WhoisGuard::from).collect())
    }

    /// The subscription allotted to `domain`, compared case-insensitively.
    ///
    /// # Errors
    /// `NotFound` when no subscription is attached to the domain.
    pub async fn whoisguard_for_domain(&self, ctx: &CallContext, domain: &str) -> Result<WhoisGuard> {
        require_non_empty("domain", domain)?;
        let domain = domain.trim();
        self.list_whoisguards(ctx)
            .await?
            .into_iter()
            .find(|subscription| subscription.domain_name.eq_ignore_ascii_case(domain))
            .ok_or_else(|| not_found(format!("no WhoisGuard subscription for {domain}")))
    }

    /// `false` when the domain has no subscription at all.
    pub async fn is_whoisguard_enabled(&self, ctx: &CallContext, domain: &str) -> Result<bool> {
        match self.whoisguard_for_domain(ctx, domain).await {
            Ok(subscription) => Ok(subscription.is_enabled()),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }

    pub async fn enable_whoisguard(
        &self,
        ctx: &CallContext,
        id: u64,
        domain: &str,
        forward_to: Option<&str>,
    ) -> Result<()> {
        let mut command = toggle_command(names::WHOISGUARD_ENABLE, id, domain)?;
        if let Some(address) = forward_to.map(str::trim).filter(|address| !address.is_empty()) {
            command.set("ForwardedToEmail", address);
        }

        let response: EnableResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.is_success {
            return Err(operation_failed(&command, format!("WhoisGuard {id} was not enabled")));
        }
        info!(id, domain, "Enabled WhoisGuard");
        Ok(())
    }

    pub async fn disable_whoisguard(&self, ctx: &CallContext, id: u64, domain: &str) -> Result<()> {
        let command = toggle_command(names::WHOISGUARD_DISABLE, id, domain)?;
        let response: DisableResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.is_success {
            return Err(operation_failed(&command, format!("WhoisGuard {id} was not disabled")));
        }
        info!(id, domain, "Disabled WhoisGuard");
        Ok(())
    }

    pub async fn renew_whoisguard(
        &self,
        ctx: &CallContext,
        id: u64,
        years: u32,
    ) -> Result<WhoisGuardRenewal> {
        require_positive("years", years)?;
        let command =
            Command::new(names::WHOISGUARD_RENEW).param("WhoisguardID", id).param("Years", years);
        let response: RenewResponse = self.pipeline().execute_typed(ctx, &command).await?;
        let wire = response.result;
        if !wire.renewed {
            return Err(operation_failed(&command, format!("WhoisGuard {id} was not renewed")));
        }
        Ok(WhoisGuardRenewal {
            id: if wire.id == 0 { id } else { wire.id },
            renewed: wire.renewed,
            charged_amount: wire.charged_amount,
            order_id: wire.order_id,
            transaction_id: wire.transaction_id,
        })
    }
}
