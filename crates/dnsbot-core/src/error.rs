//! Error types for the DNS bot core
//!
//! Three closed taxonomies travel through the core:
//!
//! - [`ParseError`]: bad user input, always recoverable by re-prompting
//! - [`ProviderError`]: normalized provider failures, never raw transport errors
//! - [`FlowError`]: terminal reasons for an interactive flow
//!
//! [`Error`] wraps the rest (configuration, registry, serialization).

use crate::model::{DnsRecord, RecordType};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while resolving user input into an operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Record type token is not one of the supported types
    #[error("invalid record type: {0}")]
    InvalidType(String),

    /// TTL token is neither `auto` nor an integer in range
    #[error("invalid TTL: {0} (use seconds between 60 and 86400, or 'auto')")]
    InvalidTtl(String),

    /// Boolean token is not one of the accepted spellings
    #[error("invalid boolean: {0} (use true/false or yes/no)")]
    InvalidBoolean(String),

    /// Content does not have the shape the record type requires
    #[error("invalid content for {record_type} record: {reason}")]
    InvalidContentShape {
        /// Record type the content was checked against
        record_type: RecordType,
        /// What is wrong with it
        reason: String,
    },

    /// Record name is not a usable label or domain
    #[error("invalid record name: {0}")]
    InvalidName(String),

    /// First token is not a known command
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl ParseError {
    pub(crate) fn content(record_type: RecordType, reason: impl Into<String>) -> Self {
        Self::InvalidContentShape {
            record_type,
            reason: reason.into(),
        }
    }
}

/// Normalized provider failures
///
/// Upstream code never sees HTTP status codes or transport errors; provider
/// implementations map everything into one of these variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Nothing matched (record, zone)
    #[error("not found: {0}")]
    NotFound(String),

    /// More than one record matched where exactly one is required
    #[error("{} records match, pick one", .0.len())]
    AmbiguousMatch(Vec<DnsRecord>),

    /// Provider asked us to slow down
    #[error("rate limited by provider")]
    RateLimited {
        /// Server-suggested wait, when the provider sent one
        retry_after: Option<Duration>,
    },

    /// Credential missing, invalid or lacking permission
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Response could not be decoded into the domain model
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Timeouts, connection failures, 5xx
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// Provider (or local validation) refused the request; message kept verbatim
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    /// Whether the retry policy may try this call again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited { .. })
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a rejection carrying the provider's own message
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

/// Terminal reasons for an interactive flow
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    /// The session idled past its deadline
    #[error("session expired")]
    SessionExpired,

    /// Too many invalid replies to one prompt
    #[error("too many invalid replies")]
    RetryLimitExceeded,

    /// The user cancelled
    #[error("cancelled")]
    Cancelled,
}

/// Crate-level error for everything outside the three taxonomies
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider failure outside a user command (startup zone check, registry)
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
