//! # Registrar Infrastructure
//!
//! I/O side of the registrar client.
//!
//! This crate contains:
//! - The HTTP transport (reqwest)
//! - The Namecheap codec, request pipeline and typed operations
//! - Configuration loading from environment and files
//! - Tracing subscriber setup for binaries
//!
//! ## Architecture
//! - Resilience primitives come from `registrar-common`
//! - Caller-facing types and errors come from `registrar-domain`
//! - Contains all "impure" code (network, environment, filesystem)

pub mod config;
pub mod http;
pub mod integrations;
pub mod observability;

// Re-export commonly used items
pub use http::{HttpTransport, Transport, TransportError, WireRequest};
pub use integrations::namecheap::{NamecheapClient, RequestPipeline};
