//! Shared helpers for the registrar integration tests.

use registrar_domain::{ClientConfig, Credentials};
use wiremock::MockServer;

pub const API_PATH: &str = "/xml.response";

/// Configuration pointed at `server` with short retry delays and a roomy
/// token bucket.
pub fn config_for(server: &MockServer) -> ClientConfig {
    let mut config =
        ClientConfig::new(Credentials::new("apiuser", "test-api-key", "owner", "203.0.113.7"));
    config.endpoint.base_url = Some(format!("{}{API_PATH}", server.uri()));
    config.rate_limit.requests_per_second = 1000.0;
    config.rate_limit.burst = 100;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.retry.jitter_fraction = 0.0;
    config.http.attempt_timeout_secs = 5;
    config
}

pub fn ok_envelope(command: &str, inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<ApiResponse Status="OK" xmlns="http://api.namecheap.com/xml.response">
  <Errors />
  <Warnings />
  <RequestedCommand>{command}</RequestedCommand>
  <CommandResponse Type="{command}">{inner}</CommandResponse>
  <Server>SERVER-TEST</Server>
  <ExecutionTime>0.01</ExecutionTime>
</ApiResponse>"#
    )
}

pub fn error_envelope(command: &str, code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<ApiResponse Status="ERROR" xmlns="http://api.namecheap.com/xml.response">
  <Errors>
    <Error Number="{code}">{message}</Error>
  </Errors>
  <Warnings />
  <RequestedCommand>{command}</RequestedCommand>
  <Server>SERVER-TEST</Server>
  <ExecutionTime>0.01</ExecutionTime>
</ApiResponse>"#
    )
}

pub const BALANCES: &str = r#"<UserGetBalancesResult Currency="USD" AvailableBalance="25.50" AccountBalance="30.00" EarnedAmount="0.00" WithdrawableAmount="0.00" FundsRequiredForAutoRenew="4.50" />"#;

/// Value of query parameter `key` in the `index`-th request `server` saw.
pub async fn query_value(server: &MockServer, index: usize, key: &str) -> Option<String> {
    let requests = server.received_requests().await.unwrap_or_default();
    let request = requests.get(index)?;
    request.url.query_pairs().find(|(name, _)| name == key).map(|(_, value)| value.into_owned())
}

pub async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|requests| requests.len()).unwrap_or_default()
}
