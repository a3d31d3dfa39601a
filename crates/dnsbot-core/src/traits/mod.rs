//! Core traits for the DNS bot
//!
//! - [`DnsProvider`]: talk to a DNS provider's management API
//! - [`AccessPolicy`]: decide who may talk to the bot

pub mod access;
pub mod dns_provider;

pub use access::{AccessPolicy, AllowList};
pub use dns_provider::{DnsProvider, DnsProviderFactory};
