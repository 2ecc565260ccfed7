//! DNS host-set management
//!
//! The registrar only offers "read all hosts" and "replace all hosts". The
//! single-record helpers read the set, change it in memory and write the
//! whole set back. That read-modify-write is not atomic: two writers racing
//! on the same domain lose one update (last writer wins).

use registrar_common::resilience::{CallContext, Clock};
use registrar_domain::{DomainName, HostRecord, RecordType, RegistrarError, Result};
use serde::Deserialize;
use tracing::{debug, info};

use super::client::{not_found, operation_failed, NamecheapClient};
use super::command::{names, Command};
use super::wire::{flag, optional_number};
use crate::http::Transport;

/// MX preference sent when an MX record does not carry one.
const DEFAULT_MX_PREF: u32 = 10;

#[derive(Debug, Deserialize)]
struct GetHostsResponse {
    #[serde(rename = "DomainDNSGetHostsResult")]
    result: HostList,
}

#[derive(Debug, Deserialize)]
struct HostList {
    #[serde(rename = "host", alias = "Host", default)]
    hosts: Vec<WireHost>,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WireHost {
    #[serde(rename = "@HostId", default, deserialize_with = "optional_number")]
    host_id: Option<u64>,
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Type")]
    record_type: String,
    #[serde(rename = "@Address", default)]
    address: String,
    #[serde(rename = "@MXPref", default, deserialize_with = "optional_number")]
    mx_pref: Option<u32>,
    #[serde(rename = "@TTL", default, deserialize_with = "optional_number")]
    ttl: Option<u32>,
    #[serde(rename = "@IsActive", default = "active_by_default", deserialize_with = "flag")]
    is_active: bool,
}

impl From<WireHost> for HostRecord {
    fn from(wire: WireHost) -> Self {
        let record_type = RecordType::from(wire.record_type);
        let mx_pref = if record_type == RecordType::Mx { wire.mx_pref } else { None };
        Self {
            host_id: wire.host_id,
            name: wire.name,
            record_type,
            address: wire.address,
            mx_pref,
            ttl: wire.ttl,
            is_active: wire.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetHostsResponse {
    #[serde(rename = "DomainDNSSetHostsResult")]
    result: WireSetHosts,
}

#[derive(Debug, Deserialize)]
struct WireSetHosts {
    #[serde(rename = "@IsSuccess", default, deserialize_with = "flag")]
    is_success: bool,
}

fn hosts_command(name: &str, domain: &DomainName) -> Command {
    Command::new(name).param("SLD", domain.sld()).param("TLD", domain.tld())
}

/// Build the `setHosts` command with indexed record parameters (1-based).
fn set_hosts_command(domain: &DomainName, records: &[HostRecord]) -> Result<Command> {
    let mut command = hosts_command(names::DNS_SET_HOSTS, domain);
    let mut has_mx = false;

    for (index, record) in records.iter().enumerate() {
        if record.name.trim().is_empty() {
            return Err(RegistrarError::InvalidInput(format!("record {} has no name", index + 1)));
        }
        if record.address.trim().is_empty() {
            return Err(RegistrarError::InvalidInput(format!(
                "record {} ({} {}) has no address",
                index + 1,
                record.name,
                record.record_type
            )));
        }

        let n = index + 1;
        command.set(format!("HostName{n}"), &record.name);
        command.set(format!("RecordType{n}"), &record.record_type);
        command.set(format!("Address{n}"), &record.address);
        if let Some(ttl) = record.ttl {
            command.set(format!("TTL{n}"), ttl);
        }
        if record.record_type == RecordType::Mx {
            has_mx = true;
            command.set(format!("MXPref{n}"), record.mx_pref.unwrap_or(DEFAULT_MX_PREF));
        }
    }

    if has_mx {
        command.set("EmailType", "MX");
    }
    Ok(command)
}

fn position(records: &[HostRecord], name: &str, record_type: &RecordType) -> Option<usize> {
    records.iter().position(|record| record.matches(name, record_type))
}

impl<T: Transport, C: Clock> NamecheapClient<T, C> {
    pub async fn get_host_records(&self, ctx: &CallContext, domain: &str) -> Result<Vec<HostRecord>> {
        let domain = DomainName::parse(domain)?;
        let command = hosts_command(names::DNS_GET_HOSTS, &domain);
        let response: GetHostsResponse = self.pipeline().execute_typed(ctx, &command).await?;
        let records: Vec<HostRecord> =
            response.result.hosts.into_iter().map(HostRecord::from).collect();
        debug!(domain = %domain, count = records.len(), "Fetched host records");
        Ok(records)
    }

    /// Replace the domain's whole host set with `records`.
    pub async fn set_host_records(
        &self,
        ctx: &CallContext,
        domain: &str,
        records: &[HostRecord],
    ) -> Result<()> {
        let domain = DomainName::parse(domain)?;
        let command = set_hosts_command(&domain, records)?;
        let response: SetHostsResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.is_success {
            return Err(operation_failed(&command, format!("host records of {domain} not updated")));
        }
        info!(domain = %domain, count = records.len(), "Replaced host records");
        Ok(())
    }

    /// The record identified by `(name, record_type)`, if any. Names compare
    /// case-insensitively.
    pub async fn find_host_record(
        &self,
        ctx: &CallContext,
        domain: &str,
        name: &str,
        record_type: &RecordType,
    ) -> Result<Option<HostRecord>> {
        let records = self.get_host_records(ctx, domain).await?;
        Ok(records.into_iter().find(|record| record.matches(name, record_type)))
    }

    pub async fn host_record_exists(
        &self,
        ctx: &CallContext,
        domain: &str,
        name: &str,
        record_type: &RecordType,
    ) -> Result<bool> {
        Ok(self.find_host_record(ctx, domain, name, record_type).await?.is_some())
    }

    /// Add `record` to the host set.
    ///
    /// # Errors
    /// `InvalidInput` when a record with the same name and type already
    /// exists. Not atomic with respect to other writers.
    pub async fn create_host_record(
        &self,
        ctx: &CallContext,
        domain: &str,
        record: HostRecord,
    ) -> Result<()> {
        let mut records = self.get_host_records(ctx, domain).await?;
        if position(&records, &record.name, &record.record_type).is_some() {
            return Err(RegistrarError::InvalidInput(format!(
                "{} record {} already exists on {domain}",
                record.record_type, record.name
            )));
        }
        records.push(record);
        self.set_host_records(ctx, domain, &records).await
    }

    /// Replace the record with the same name and type as `record`.
    ///
    /// # Errors
    /// `NotFound` when no such record exists. Not atomic with respect to
    /// other writers.
    pub async fn update_host_record(
        &self,
        ctx: &CallContext,
        domain: &str,
        record: HostRecord,
    ) -> Result<()> {
        let mut records = self.get_host_records(ctx, domain).await?;
        let Some(index) = position(&records, &record.name, &record.record_type) else {
            return Err(not_found(format!(
                "{} record {} not found on {domain}",
                record.record_type, record.name
            )));
        };
        records[index] = record;
        self.set_host_records(ctx, domain, &records).await
    }

    /// Remove every record named `name` with type `record_type`.
    ///
    /// # Errors
    /// `NotFound` when no such record exists. Not atomic with respect to
    /// other writers.
    pub async fn delete_host_record(
        &self,
        ctx: &CallContext,
        domain: &str,
        name: &str,
        record_type: &RecordType,
    ) -> Result<()> {
        let mut records = self.get_host_records(ctx, domain).await?;
        let before = records.len();
        records.retain(|record| !record.matches(name, record_type));
        if records.len() == before {
            return Err(not_found(format!("{record_type} record {name} not found on {domain}")));
        }
        self.set_host_records(ctx, domain, &records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::namecheap::fixtures::parse;

    const HOSTS: &str = r#"<DomainDNSGetHostsResult Domain="example.com" IsUsingOurDNS="true">
        <host HostId="12" Name="@" Type="A" Address="203.0.113.10" MXPref="10" TTL="1800" IsActive="true" />
        <host HostId="14" Name="www" Type="CNAME" Address="example.com." MXPref="10" TTL="1800" IsActive="true" />
        <host HostId="15" Name="@" Type="MX" Address="mail.example.com." MXPref="20" TTL="" IsActive="false" />
      </DomainDNSGetHostsResult>"#;

    #[test]
    fn test_parse_hosts() {
        let response: GetHostsResponse = parse(names::DNS_GET_HOSTS, HOSTS);
        let records: Vec<HostRecord> =
            response.result.hosts.into_iter().map(HostRecord::from).collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].host_id, Some(12));
        assert_eq!(records[0].record_type, RecordType::A);
        assert_eq!(records[0].mx_pref, None);
        assert_eq!(records[0].ttl, Some(1800));
        assert_eq!(records[1].record_type, RecordType::Cname);
        assert_eq!(records[2].mx_pref, Some(20));
        assert_eq!(records[2].ttl, None);
        assert!(!records[2].is_active);
    }

    #[test]
    fn test_parse_empty_host_set() {
        let response: GetHostsResponse = parse(
            names::DNS_GET_HOSTS,
            r#"<DomainDNSGetHostsResult Domain="example.com" IsUsingOurDNS="true" />"#,
        );
        assert!(response.result.hosts.is_empty());
    }

    #[test]
    fn test_set_hosts_command_indexes_records() {
        let domain = DomainName::parse("example.com").expect("valid");
        let records = vec![
            HostRecord::new("@", RecordType::A, "203.0.113.10").with_ttl(300),
            HostRecord::new("@", RecordType::Mx, "mail.example.com."),
            HostRecord::new("@", RecordType::Mx, "backup.example.com.").with_mx_pref(30),
        ];
        let command = set_hosts_command(&domain, &records).expect("command");

        assert_eq!(command.get("SLD"), Some("example"));
        assert_eq!(command.get("HostName1"), Some("@"));
        assert_eq!(command.get("RecordType1"), Some("A"));
        assert_eq!(command.get("Address1"), Some("203.0.113.10"));
        assert_eq!(command.get("TTL1"), Some("300"));
        assert_eq!(command.get("MXPref1"), None);
        assert_eq!(command.get("TTL2"), None);
        assert_eq!(command.get("MXPref2"), Some("10"));
        assert_eq!(command.get("MXPref3"), Some("30"));
        assert_eq!(command.get("EmailType"), Some("MX"));
    }

    #[test]
    fn test_set_hosts_command_rejects_blank_fields() {
        let domain = DomainName::parse("example.com").expect("valid");
        let records = vec![HostRecord::new("www", RecordType::A, " ")];
        assert!(matches!(
            set_hosts_command(&domain, &records),
            Err(RegistrarError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_set_has_no_record_params() {
        let domain = DomainName::parse("example.com").expect("valid");
        let command = set_hosts_command(&domain, &[]).expect("command");
        assert_eq!(command.params().len(), 2);
    }
}
