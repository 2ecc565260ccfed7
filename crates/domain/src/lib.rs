//! # Registrar Domain
//!
//! Caller-facing types for the registrar client.
//!
//! This crate contains:
//! - The error taxonomy callers branch on ([`RegistrarError`], [`Disposition`])
//! - Client configuration structures with conservative defaults
//! - Typed records returned by registrar operations
//! - Endpoint and default constants
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - No I/O; everything here is plain data

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
