//! Domain lifecycle: listing, lookup, registration, renewal and nameservers

use registrar_common::resilience::{CallContext, Clock};
use registrar_domain::constants::DOMAIN_LIST_PAGE_SIZE;
use registrar_domain::{
    DnsDetails, Domain, DomainInfo, DomainName, DomainRegistration, DomainRenewal, RegistrarError,
    Result,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::client::{operation_failed, require_positive, NamecheapClient};
use super::command::{names, Command};
use super::wire::{amount, flag};
use crate::http::Transport;

#[derive(Debug, Deserialize)]
struct GetListResponse {
    #[serde(rename = "DomainGetListResult")]
    result: DomainList,
    #[serde(rename = "Paging", default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct DomainList {
    #[serde(rename = "Domain", default)]
    domains: Vec<WireDomain>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(rename = "TotalItems", default)]
    total_items: u64,
}

#[derive(Debug, Deserialize)]
struct WireDomain {
    #[serde(rename = "@ID")]
    id: u64,
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@User", default)]
    user: String,
    #[serde(rename = "@Created", default)]
    created: String,
    #[serde(rename = "@Expires", default)]
    expires: String,
    #[serde(rename = "@IsExpired", default, deserialize_with = "flag")]
    is_expired: bool,
    #[serde(rename = "@IsLocked", default, deserialize_with = "flag")]
    is_locked: bool,
    #[serde(rename = "@AutoRenew", default, deserialize_with = "flag")]
    auto_renew: bool,
    #[serde(rename = "@WhoisGuard", default)]
    whois_guard: String,
    #[serde(rename = "@IsPremium", default, deserialize_with = "flag")]
    is_premium: bool,
    #[serde(rename = "@IsOurDNS", default, deserialize_with = "flag")]
    is_our_dns: bool,
}

impl From<WireDomain> for Domain {
    fn from(wire: WireDomain) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            user: wire.user,
            created: wire.created,
            expires: wire.expires,
            is_expired: wire.is_expired,
            is_locked: wire.is_locked,
            auto_renew: wire.auto_renew,
            whois_guard: wire.whois_guard,
            is_premium: wire.is_premium,
            is_our_dns: wire.is_our_dns,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetInfoResponse {
    #[serde(rename = "DomainGetInfoResult")]
    result: WireDomainInfo,
}

#[derive(Debug, Deserialize)]
struct WireDomainInfo {
    #[serde(rename = "@ID")]
    id: u64,
    #[serde(rename = "@DomainName")]
    name: String,
    #[serde(rename = "@OwnerName", default)]
    owner: String,
    #[serde(rename = "@Status", default)]
    status: String,
    #[serde(rename = "@IsPremium", default, deserialize_with = "flag")]
    is_premium: bool,
    #[serde(rename = "DomainDetails", default)]
    details: Option<WireDomainDetails>,
    #[serde(rename = "Whoisguard", default)]
    whoisguard: Option<WireWhoisguardFlag>,
    #[serde(rename = "DnsDetails", default)]
    dns: Option<WireDnsDetails>,
}

#[derive(Debug, Deserialize)]
struct WireDomainDetails {
    #[serde(rename = "CreatedDate", default)]
    created: String,
    #[serde(rename = "ExpiredDate", default)]
    expires: String,
}

#[derive(Debug, Deserialize)]
struct WireWhoisguardFlag {
    #[serde(rename = "@Enabled", default, deserialize_with = "flag")]
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct WireDnsDetails {
    #[serde(rename = "@ProviderType", default)]
    provider_type: String,
    #[serde(rename = "@IsUsingOurDNS", default, deserialize_with = "flag")]
    is_using_our_dns: bool,
    #[serde(rename = "Nameserver", default)]
    nameservers: Vec<String>,
}

impl From<WireDomainInfo> for DomainInfo {
    fn from(wire: WireDomainInfo) -> Self {
        let (created, expires) =
            wire.details.map(|d| (d.created, d.expires)).unwrap_or_default();
        let dns = wire
            .dns
            .map(|dns| DnsDetails {
                provider_type: dns.provider_type,
                is_using_our_dns: dns.is_using_our_dns,
                nameservers: dns.nameservers.into_iter().map(|ns| ns.trim().to_string()).collect(),
            })
            .unwrap_or_default();
        Self {
            id: wire.id,
            name: wire.name,
            owner: wire.owner,
            status: wire.status,
            is_premium: wire.is_premium,
            created,
            expires,
            whoisguard_enabled: wire.whoisguard.is_some_and(|wg| wg.enabled),
            dns,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "DomainCreateResult")]
    result: WireRegistration,
}

#[derive(Debug, Deserialize)]
struct WireRegistration {
    #[serde(rename = "@Domain")]
    domain: String,
    #[serde(rename = "@Registered", default, deserialize_with = "flag")]
    registered: bool,
    #[serde(rename = "@ChargedAmount", default, deserialize_with = "amount")]
    charged_amount: f64,
    #[serde(rename = "@DomainID", default)]
    domain_id: u64,
    #[serde(rename = "@OrderID", default)]
    order_id: u64,
    #[serde(rename = "@TransactionID", default)]
    transaction_id: u64,
    #[serde(rename = "@WhoisguardEnable", default, deserialize_with = "flag")]
    whoisguard_enabled: bool,
    #[serde(rename = "@NonRealTimeDomain", default, deserialize_with = "flag")]
    non_real_time: bool,
}

#[derive(Debug, Deserialize)]
struct RenewResponse {
    #[serde(rename = "DomainRenewResult")]
    result: WireRenewal,
}

#[derive(Debug, Deserialize)]
struct WireRenewal {
    #[serde(rename = "@DomainName")]
    domain: String,
    #[serde(rename = "@DomainID", default)]
    domain_id: u64,
    #[serde(rename = "@Renew", default, deserialize_with = "flag")]
    renewed: bool,
    #[serde(rename = "@ChargedAmount", default, deserialize_with = "amount")]
    charged_amount: f64,
    #[serde(rename = "@OrderID", default)]
    order_id: u64,
    #[serde(rename = "@TransactionID", default)]
    transaction_id: u64,
    #[serde(rename = "DomainDetails", default)]
    details: Option<WireDomainDetails>,
}

#[derive(Debug, Deserialize)]
struct SetCustomResponse {
    #[serde(rename = "DomainDNSSetCustomResult")]
    result: WireDnsUpdate,
}

#[derive(Debug, Deserialize)]
struct SetDefaultResponse {
    #[serde(rename = "DomainDNSSetDefaultResult")]
    result: WireDnsUpdate,
}

#[derive(Debug, Deserialize)]
struct WireDnsUpdate {
    #[serde(rename = "@Updated", alias = "@Update", default, deserialize_with = "flag")]
    updated: bool,
}

fn list_command(page: u32) -> Command {
    Command::new(names::DOMAINS_GET_LIST).param("Page", page).param("PageSize", DOMAIN_LIST_PAGE_SIZE)
}

fn sld_tld_command(name: &str, domain: &DomainName) -> Command {
    Command::new(name).param("SLD", domain.sld()).param("TLD", domain.tld())
}

fn set_custom_command<S: AsRef<str>>(domain: &DomainName, nameservers: &[S]) -> Result<Command> {
    if nameservers.is_empty() {
        return Err(RegistrarError::InvalidInput(
            "at least one nameserver must be provided".to_string(),
        ));
    }
    let mut cleaned = Vec::with_capacity(nameservers.len());
    for nameserver in nameservers {
        let nameserver = nameserver.as_ref().trim();
        if nameserver.is_empty() {
            return Err(RegistrarError::InvalidInput("nameserver must not be blank".to_string()));
        }
        cleaned.push(nameserver);
    }
    Ok(sld_tld_command(names::DNS_SET_CUSTOM, domain).param("Nameservers", cleaned.join(",")))
}

impl<T: Transport, C: Clock> NamecheapClient<T, C> {
    /// Every domain in the account, fetched page by page.
    pub async fn list_domains(&self, ctx: &CallContext) -> Result<Vec<Domain>> {
        let mut domains = Vec::new();
        let mut page = 1u32;
        loop {
            let response: GetListResponse =
                self.pipeline().execute_typed(ctx, &list_command(page)).await?;
            let received = response.result.domains.len();
            domains.extend(response.result.domains.into_iter().map(Domain::from));

            let total = response.paging.map_or(0, |paging| paging.total_items);
            let fetched = u64::try_from(domains.len()).unwrap_or(u64::MAX);
            if received == 0 || fetched >= total {
                break;
            }
            page += 1;
        }
        debug!(count = domains.len(), "Listed domains");
        Ok(domains)
    }

    pub async fn get_domain(&self, ctx: &CallContext, name: &str) -> Result<DomainInfo> {
        let domain = DomainName::parse(name)?;
        let command = Command::new(names::DOMAINS_GET_INFO).param("DomainName", &domain);
        let response: GetInfoResponse = self.pipeline().execute_typed(ctx, &command).await?;
        Ok(response.result.into())
    }

    /// Whether the account holds `name`. Only a not-found classification
    /// maps to `false`; every other failure is returned.
    pub async fn domain_exists(&self, ctx: &CallContext, name: &str) -> Result<bool> {
        match self.get_domain(ctx, name).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Register `name` for `years` years using the account's default contacts.
    pub async fn create_domain(
        &self,
        ctx: &CallContext,
        name: &str,
        years: u32,
    ) -> Result<DomainRegistration> {
        self.create_domain_with(ctx, name, years, &[]).await
    }

    /// Register `name` with additional parameters such as registrant contact
    /// fields (`RegistrantFirstName`, ...).
    pub async fn create_domain_with(
        &self,
        ctx: &CallContext,
        name: &str,
        years: u32,
        extra: &[(&str, &str)],
    ) -> Result<DomainRegistration> {
        let domain = DomainName::parse(name)?;
        require_positive("years", years)?;

        let mut command =
            Command::new(names::DOMAINS_CREATE).param("DomainName", &domain).param("Years", years);
        for (key, value) in extra {
            command.set(*key, value);
        }

        let response: CreateResponse = self.pipeline().execute_typed(ctx, &command).await?;
        let wire = response.result;
        if !wire.registered {
            return Err(operation_failed(&command, format!("{domain} was not registered")));
        }
        info!(domain = %domain, years, charged = wire.charged_amount, "Registered domain");
        Ok(DomainRegistration {
            domain: wire.domain,
            registered: wire.registered,
            charged_amount: wire.charged_amount,
            domain_id: wire.domain_id,
            order_id: wire.order_id,
            transaction_id: wire.transaction_id,
            whoisguard_enabled: wire.whoisguard_enabled,
            non_real_time: wire.non_real_time,
        })
    }

    pub async fn renew_domain(
        &self,
        ctx: &CallContext,
        name: &str,
        years: u32,
    ) -> Result<DomainRenewal> {
        let domain = DomainName::parse(name)?;
        require_positive("years", years)?;
        let command =
            Command::new(names::DOMAINS_RENEW).param("DomainName", &domain).param("Years", years);

        let response: RenewResponse = self.pipeline().execute_typed(ctx, &command).await?;
        let wire = response.result;
        if !wire.renewed {
            return Err(operation_failed(&command, format!("{domain} was not renewed")));
        }
        info!(domain = %domain, years, charged = wire.charged_amount, "Renewed domain");
        Ok(DomainRenewal {
            domain: wire.domain,
            domain_id: wire.domain_id,
            renewed: wire.renewed,
            charged_amount: wire.charged_amount,
            order_id: wire.order_id,
            transaction_id: wire.transaction_id,
            expires: wire.details.map(|d| d.expires).unwrap_or_default(),
        })
    }

    /// Point `name` at custom nameservers.
    pub async fn set_nameservers<S: AsRef<str>>(
        &self,
        ctx: &CallContext,
        name: &str,
        nameservers: &[S],
    ) -> Result<()> {
        let domain = DomainName::parse(name)?;
        let command = set_custom_command(&domain, nameservers)?;
        let response: SetCustomResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.updated {
            return Err(operation_failed(&command, format!("nameservers of {domain} not updated")));
        }
        Ok(())
    }

    /// Switch `name` back to the registrar's own DNS.
    pub async fn set_default_dns(&self, ctx: &CallContext, name: &str) -> Result<()> {
        let domain = DomainName::parse(name)?;
        let command = sld_tld_command(names::DNS_SET_DEFAULT, &domain);
        let response: SetDefaultResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.updated {
            return Err(operation_failed(&command, format!("DNS of {domain} not reset")));
        }
        Ok(())
    }
}
