//! Namecheap registrar integration
//!
//! # Architecture
//!
//! - **Codec**: `encode`/`decode` between [`Command`]s and the XML envelope
//! - **Classification**: every failed attempt becomes one [`ClassifiedError`]
//! - **Pipeline**: [`RequestPipeline`] wraps each command in the circuit
//!   breaker, the retry executor and the token bucket
//! - **Client**: [`NamecheapClient`] exposes typed operations grouped by area
//!
//! # Usage
//!
//! ```no_run
//! use registrar_common::CallContext;
//! use registrar_domain::{ClientConfig, Credentials};
//! use registrar_infra::integrations::namecheap::NamecheapClient;
//!
//! # async fn example() -> registrar_domain::Result<()> {
//! let config = ClientConfig::new(Credentials::new("api-user", "api-key", "owner", "203.0.113.7"));
//! let client = NamecheapClient::new(&config)?;
//!
//! let ctx = CallContext::new().with_timeout(std::time::Duration::from_secs(60));
//! for domain in client.list_domains(&ctx).await? {
//!     println!("{} expires {}", domain.name, domain.expires);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - **Network errors, 5xx, provider rate limiting**: retried with backoff
//! - **Provider rejections**: returned verbatim as `RemoteRejected`, one request
//! - **Unparseable responses**: `ProtocolError`, never retried
//! - **Caller cancellation**: `Canceled`, does not count against the breaker

pub mod client;
pub mod codec;
pub mod command;
pub mod dns;
pub mod domains;
pub mod errors;
pub mod pipeline;
pub mod ssl;
pub mod users;
pub mod whoisguard;
mod wire;

pub use client::NamecheapClient;
pub use codec::{decode, decode_payload, encode, Envelope, ProviderError};
pub use command::{names, Command};
pub use errors::{ClassifiedError, RegistrarRetryPolicy};
pub use pipeline::RequestPipeline;
