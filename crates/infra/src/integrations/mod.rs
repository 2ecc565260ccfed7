//! External service integrations

pub mod namecheap;
