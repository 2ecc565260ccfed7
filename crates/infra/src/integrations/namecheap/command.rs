//! Registrar commands

use std::fmt;

/// Command names understood by the registrar API.
pub mod names {
    pub const DOMAINS_GET_LIST: &str = "namecheap.domains.getList";
    pub const DOMAINS_GET_INFO: &str = "namecheap.domains.getInfo";
    pub const DOMAINS_CREATE: &str = "namecheap.domains.create";
    pub const DOMAINS_RENEW: &str = "namecheap.domains.renew";
    pub const DOMAINS_GET_TLD_LIST: &str = "namecheap.domains.getTldList";
    pub const DNS_SET_CUSTOM: &str = "namecheap.domains.dns.setCustom";
    pub const DNS_SET_DEFAULT: &str = "namecheap.domains.dns.setDefault";
    pub const DNS_GET_HOSTS: &str = "namecheap.domains.dns.getHosts";
    pub const DNS_SET_HOSTS: &str = "namecheap.domains.dns.setHosts";
    pub const SSL_GET_LIST: &str = "namecheap.ssl.getList";
    pub const SSL_CREATE: &str = "namecheap.ssl.create";
    pub const SSL_ACTIVATE: &str = "namecheap.ssl.activate";
    pub const SSL_GET_INFO: &str = "namecheap.ssl.getInfo";
    pub const SSL_RESEND_APPROVER_EMAIL: &str = "namecheap.ssl.resendApproverEmail";
    pub const SSL_REISSUE: &str = "namecheap.ssl.reissue";
    pub const WHOISGUARD_GET_LIST: &str = "namecheap.whoisguard.getList";
    pub const WHOISGUARD_ENABLE: &str = "namecheap.whoisguard.enable";
    pub const WHOISGUARD_DISABLE: &str = "namecheap.whoisguard.disable";
    pub const WHOISGUARD_RENEW: &str = "namecheap.whoisguard.renew";
    pub const USERS_GET_BALANCES: &str = "namecheap.users.getBalances";
    pub const USERS_GET_PRICING: &str = "namecheap.users.getPricing";
}

/// A command name plus its parameters in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    params: Vec<(String, String)>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: Vec::new() }
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key`, replacing an earlier value in place so the original
    /// position is kept.
    pub fn set(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        let key = key.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut command = Command::new(names::DOMAINS_RENEW).param("DomainName", "a.com").param("Years", 1);
        command.set("Years", 3);
        command.set("PromotionCode", "SAVE");

        assert_eq!(
            command.params(),
            &[
                ("DomainName".to_string(), "a.com".to_string()),
                ("Years".to_string(), "3".to_string()),
                ("PromotionCode".to_string(), "SAVE".to_string()),
            ]
        );
        assert_eq!(command.get("Years"), Some("3"));
        assert_eq!(command.to_string(), "namecheap.domains.renew");
    }
}
