// # dnsbot-core
//
// Core library for the chat-driven DNS management bot.
//
// ## Architecture Overview
//
// - **Command resolver**: turns one line of text into an operation, or a
//   pending operation with its missing fields
// - **Record matcher**: qualifies names against the active zone and refuses
//   to pick among several matches
// - **ProviderClient**: retry, backoff and idempotency over a `DnsProvider`
// - **Flow sessions**: per-user state machine for multi-message commands
// - **ZoneContexts**: active zone per operating context
// - **CommandEngine**: ties the above together behind one `handle` call
// - **ProviderRegistry**: plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: core logic is separate from provider and transport
// 2. **Plugin-Based**: providers are registered dynamically, no hard-coded if-else
// 3. **Library-First**: the daemon is a thin shell over this crate
// 4. **No Silent Guessing**: ambiguous targets always go back to the user

pub mod client;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod matcher;
pub mod model;
pub mod registry;
pub mod state;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use client::ProviderClient;
pub use command::{Command, CommandKind, Field, Operation, PendingOperation, resolve};
pub use config::{BotConfig, FlowConfig, ProviderConfig, RetryConfig};
pub use engine::{CommandEngine, InboundMessage, Reply};
pub use error::{Error, FlowError, ParseError, ProviderError, Result};
pub use model::{
    ContextId, DnsRecord, Page, RecordFilter, RecordPatch, RecordSpec, RecordType, Ttl, UserId, Zone,
};
pub use registry::ProviderRegistry;
pub use traits::{AccessPolicy, AllowList, DnsProvider};
pub use zone::ZoneContexts;
