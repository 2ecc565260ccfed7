//! Connectivity check: loads the configuration, fetches the account balance
//! and prints it.
//!
//! ```text
//! NAMECHEAP_API_USER=... NAMECHEAP_API_KEY=... NAMECHEAP_USERNAME=... \
//! NAMECHEAP_CLIENT_IP=... NAMECHEAP_SANDBOX=true registrar-probe
//! ```

use std::time::Duration;

use anyhow::Context;
use registrar_common::CallContext;
use registrar_infra::config;
use registrar_infra::integrations::namecheap::NamecheapClient;
use registrar_infra::observability::{init_tracing, LogFormat, DEFAULT_FILTER};

const PROBE_DEADLINE: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(DEFAULT_FILTER, LogFormat::Text)?;

    let config = config::load().context("loading registrar configuration")?;
    tracing::info!(endpoint = config.endpoint.url(), "Probing registrar");

    let client = NamecheapClient::new(&config).context("building registrar client")?;
    let ctx = CallContext::new().with_timeout(PROBE_DEADLINE);
    let balance = client.get_balances(&ctx).await.context("fetching account balance")?;

    println!("currency:            {}", balance.currency);
    println!("available balance:   {:.2}", balance.available_balance);
    println!("account balance:     {:.2}", balance.account_balance);
    println!("earned amount:       {:.2}", balance.earned_amount);
    println!("withdrawable amount: {:.2}", balance.withdrawable_amount);
    println!("auto-renew reserve:  {:.2}", balance.funds_required_for_auto_renew);

    let breaker = client.breaker_snapshot();
    tracing::debug!(state = ?breaker.state, "Breaker after probe");
    Ok(())
}
