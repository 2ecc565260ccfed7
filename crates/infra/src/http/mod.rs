//! HTTP transport
//!
//! One [`Transport::exchange`] is exactly one network round trip. Retrying,
//! pacing and breaker accounting live above this layer.

pub mod client;

pub use client::{
    HttpTransport, HttpTransportBuilder, RawResponse, Transport, TransportError, WireRequest,
};
