//! Cloudflare failure classification
//!
//! Every non-success response is folded into a core `ProviderError` here.
//! Nothing above this crate sees a status code.

use dnsbot_core::{ProviderError, RecordType};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::wire::{CloudflareMessage, CloudflareResponse};

/// Longest response body excerpt that goes into a log line or error message
const LOG_BODY_LIMIT: usize = 512;

/// Local failure building a request body
#[derive(Error, Debug)]
pub enum PayloadError {
    /// Content does not split into the fields the type's `data` object needs
    #[error("cannot build {record_type} data from content '{content}'")]
    Shape { record_type: RecordType, content: String },

    /// MX and SRV bodies need a priority
    #[error("{0} record needs a priority")]
    MissingPriority(RecordType),

    /// SRV priority lives inside `data`, which needs the rest of the content
    #[error("SRV priority cannot change without its content")]
    PriorityWithoutContent,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<PayloadError> for ProviderError {
    fn from(err: PayloadError) -> Self {
        ProviderError::rejected(err.to_string())
    }
}

/// Classify a non-2xx response
pub fn classify_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> ProviderError {
    match status.as_u16() {
        429 => return ProviderError::RateLimited { retry_after },
        500..=599 => {
            return ProviderError::transient(format!(
                "Cloudflare server error {}: {}",
                status,
                truncate_for_log(body)
            ));
        }
        _ => {}
    }

    let errors = serde_json::from_str::<CloudflareResponse<serde_json::Value>>(body)
        .map(|response| response.errors)
        .unwrap_or_default();

    if let Some(err) = classify_codes(&errors) {
        return err;
    }

    let message = join_messages(&errors).unwrap_or_else(|| format!("HTTP {}", status));
    match status.as_u16() {
        401 | 403 => ProviderError::Unauthorized(message),
        404 => ProviderError::not_found(message),
        _ => ProviderError::rejected(message),
    }
}

/// Classify a 2xx envelope that still reports `success: false`
pub fn classify_envelope(errors: &[CloudflareMessage]) -> ProviderError {
    classify_codes(errors).unwrap_or_else(|| {
        ProviderError::rejected(
            join_messages(errors).unwrap_or_else(|| "request was not successful".to_string()),
        )
    })
}

/// Map Cloudflare error codes
///
/// Reference: <https://developers.cloudflare.com/api/>
fn classify_codes(errors: &[CloudflareMessage]) -> Option<ProviderError> {
    let first = errors.first()?;
    let message = join_messages(errors).unwrap_or_default();

    let err = match first.code {
        // Record does not exist
        81044 => ProviderError::not_found(message),
        // Invalid headers, invalid Authorization, unauthorized, authentication error
        6003 | 6103 | 6111 | 9109 | 10000 => ProviderError::Unauthorized(message),
        // DNS validation: name, content, TTL, proxied
        1004 | 9000 | 9005 | 9006 | 9009 | 9021 | 9041 => ProviderError::rejected(message),
        // A record with that host or those settings already exists
        81053..=81058 => ProviderError::rejected(message),
        _ => return None,
    };
    Some(err)
}

fn join_messages(errors: &[CloudflareMessage]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Parse a `Retry-After` header given in seconds
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Cut a response body down to something safe to log
pub fn truncate_for_log(body: &str) -> String {
    if body.len() <= LOG_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = LOG_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}
