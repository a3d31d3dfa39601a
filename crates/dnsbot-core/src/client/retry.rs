//! Backoff schedule for transient provider failures

use crate::config::RetryConfig;
use crate::error::ProviderError;
use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt + 1`
///
/// `min(base * 2^attempt, max_delay)`, raised to the server's `retry_after`
/// when one was sent (itself capped at `max_delay`), plus random jitter.
pub(crate) fn backoff_delay(policy: &RetryConfig, attempt: u32, error: &ProviderError) -> Duration {
    let exponential = policy
        .base_delay()
        .saturating_mul(2u32.saturating_pow(attempt));
    let mut delay = exponential.min(policy.max_delay());

    if let ProviderError::RateLimited {
        retry_after: Some(after),
    } = error
    {
        delay = delay.max((*after).min(policy.max_delay()));
    }

    delay + jitter(policy.jitter_ms)
}

fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
