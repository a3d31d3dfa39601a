//! Provider client
//!
//! Wraps an untrusted, single-shot [`DnsProvider`] with the retry policy.
//! Providers never retry; this is the only place that does.
//!
//! ## Retry rules
//!
//! - Only [`ProviderError::is_transient`] failures are retried
//! - Every attempt runs under the per-attempt timeout; expiry is transient
//! - No attempt or backoff sleep may run past the call's wall-clock budget
//! - Creates look for an already-landed record before re-sending
//! - A retried delete that finds nothing counts as done
//!
//! The zone id is an argument, read once by the caller before the call
//! starts, so a concurrent zone switch never changes it mid-retry.

mod retry;

use crate::config::RetryConfig;
use crate::error::ProviderError;
use crate::model::{DnsRecord, RecordFilter, RecordPatch, RecordSpec, RecordType, Zone};
use crate::traits::DnsProvider;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

/// Upper bound on pages fetched by one listing
const MAX_PAGES: u32 = 50;

/// Retrying client over a [`DnsProvider`]
#[derive(Clone)]
pub struct ProviderClient {
    provider: Arc<dyn DnsProvider>,
    policy: RetryConfig,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn DnsProvider>, policy: RetryConfig) -> Self {
        Self { provider, policy }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn policy(&self) -> &RetryConfig {
        &self.policy
    }

    /// List every record matching `filter`, following pagination
    pub async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<DnsRecord>, ProviderError> {
        let deadline = self.deadline();
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let batch = self
                .with_retry("list_records", deadline, |_| {
                    self.provider.list_records(zone_id, filter, page)
                })
                .await?;
            records.extend(batch.items);

            if page >= batch.total_pages {
                break;
            }
            if page >= MAX_PAGES {
                warn!(zone_id, pages = batch.total_pages, "Record listing truncated at page cap");
                break;
            }
            page += 1;
        }

        debug!(zone_id, count = records.len(), "Listed records");
        Ok(records)
    }

    /// Create a record
    ///
    /// Safe to retry: after a transient failure the next attempt first looks
    /// for a record with the same name, type and content and returns it.
    pub async fn create_record(
        &self,
        zone_id: &str,
        spec: &RecordSpec,
    ) -> Result<DnsRecord, ProviderError> {
        check_proxied(spec.record_type, spec.proxied)?;

        let deadline = self.deadline();
        self.with_retry("create_record", deadline, |attempt| async move {
            if attempt > 0
                && let Some(existing) = self.find_landed(zone_id, spec).await?
            {
                info!(
                    zone_id,
                    record = %spec.name,
                    record_id = %existing.id,
                    "Earlier create attempt landed, not sending again"
                );
                return Ok(existing);
            }
            self.provider.create_record(zone_id, spec).await
        })
        .await
    }

    async fn find_landed(
        &self,
        zone_id: &str,
        spec: &RecordSpec,
    ) -> Result<Option<DnsRecord>, ProviderError> {
        let filter = RecordFilter::by_name(spec.name.clone(), Some(spec.record_type));
        let page = self.provider.list_records(zone_id, &filter, 1).await?;
        Ok(page.items.into_iter().find(|record| spec.matches(record)))
    }

    /// Apply `patch` to `current`
    ///
    /// An empty patch makes no provider call and returns `current` unchanged.
    pub async fn update_record(
        &self,
        zone_id: &str,
        current: &DnsRecord,
        patch: &RecordPatch,
    ) -> Result<DnsRecord, ProviderError> {
        if patch.is_empty() {
            debug!(zone_id, record_id = %current.id, "Empty patch, skipping update");
            return Ok(current.clone());
        }
        check_proxied(patch.record_type, patch.proxied.unwrap_or(false))?;

        let deadline = self.deadline();
        self.with_retry("update_record", deadline, |_| {
            self.provider.update_record(zone_id, &current.id, patch)
        })
        .await
    }

    /// Delete a record by id
    pub async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError> {
        let deadline = self.deadline();
        self.with_retry("delete_record", deadline, |attempt| async move {
            match self.provider.delete_record(zone_id, record_id).await {
                Err(ProviderError::NotFound(_)) if attempt > 0 => {
                    debug!(zone_id, record_id, "Record already gone on retry");
                    Ok(())
                }
                other => other,
            }
        })
        .await
    }

    /// List every zone the credential can see
    pub async fn list_zones(&self) -> Result<Vec<Zone>, ProviderError> {
        let deadline = self.deadline();
        let mut zones = Vec::new();
        let mut page = 1;

        loop {
            let batch = self
                .with_retry("list_zones", deadline, |_| self.provider.list_zones(page))
                .await?;
            zones.extend(batch.items);

            if page >= batch.total_pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        Ok(zones)
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.policy.total_budget()
    }

    /// Run `call` until it succeeds, fails permanently, or runs out of
    /// attempts or time. `call` receives the zero-based attempt number.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        deadline: Instant,
        mut call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let limit = self.policy.attempt_timeout().min(remaining);

            let error = match timeout(limit, call(attempt)).await {
                Ok(Ok(value)) => {
                    if attempt > 0 {
                        info!(operation, attempts = attempt + 1, "Provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(error)) => error,
                Err(_) => ProviderError::transient(format!(
                    "{operation} timed out after {}ms",
                    limit.as_millis()
                )),
            };

            if !error.is_transient() {
                return Err(error);
            }
            if attempt >= self.policy.max_retries {
                warn!(operation, attempts = attempt + 1, error = %error, "Retries exhausted");
                return Err(error);
            }

            let delay = retry::backoff_delay(&self.policy, attempt, &error);
            if Instant::now() + delay >= deadline {
                warn!(operation, attempts = attempt + 1, error = %error, "Retry budget exhausted");
                return Err(error);
            }

            warn!(
                operation,
                attempt = attempt + 1,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient provider failure, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

fn check_proxied(record_type: RecordType, proxied: bool) -> Result<(), ProviderError> {
    if proxied && !record_type.is_proxiable() {
        return Err(ProviderError::rejected(format!(
            "{record_type} records cannot be proxied"
        )));
    }
    Ok(())
}
