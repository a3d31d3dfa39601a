// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 implementation of `DnsProvider`
// for the DNS chat bot.
//
// ## Implementation Status
//
// - ✅ One HTTP request per trait call
// - ✅ List, create, patch and delete DNS records; list zones
// - ✅ Paging parameters passed through (100 records, 50 zones per page)
// - ✅ Status codes and Cloudflare error codes folded into `ProviderError`
// - ✅ `Retry-After` forwarded on 429
// - ✅ SRV and CAA sent and read through their structured `data` objects
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry or backoff (owned by `ProviderClient`)
// - ❌ NO pagination loop (owned by `ProviderClient`)
// - ❌ NO active zone (owned by `ZoneContexts`)
// - ❌ NO caching
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Retry, sleep or schedule
// - ❌ Remember anything between calls
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Response bodies are truncated before they are logged
// - Provider construction fails if the token is empty
//
// ## API Reference
//
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...&page=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`
// - List Zones: GET `/zones?page=...`

pub mod error;
pub mod wire;

use async_trait::async_trait;
use dnsbot_core::config::ProviderConfig;
use dnsbot_core::traits::DnsProviderFactory;
use dnsbot_core::{
    DnsProvider, DnsRecord, Error, Page, ProviderError, RecordFilter, RecordPatch, RecordSpec, Zone,
};
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{classify_envelope, classify_status, parse_retry_after, truncate_for_log};
use crate::wire::{CloudflareResponse, WireRecord, WireZone, create_body, patch_body};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Records requested per page
const RECORDS_PER_PAGE: u32 = 100;

/// Zones requested per page
const ZONES_PER_PAGE: u32 = 50;

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot. Retries, pagination and the active zone are
/// owned by the core.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform every read (listings, the current state of a patched record)
/// - Log the intended POST/PATCH/DELETE payload
/// - **NOT** modify any DNS record
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    base_url: String,

    /// Dry-run mode: if true, perform reads but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `dry_run`: If true, perform reads but skip mutations
    /// - `http_timeout`: Timeout of a single HTTP request
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool, http_timeout: Duration) -> Result<Self, Error> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            client,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            dry_run,
        })
    }

    /// Point the provider at another API root (a proxy or a local stub)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether mutations are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record_id)
    }

    /// Send one request and decode the envelope
    ///
    /// Transport failures are transient; non-2xx statuses are classified;
    /// an undecodable 2xx body is malformed.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<CloudflareResponse<T>, ProviderError> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| ProviderError::transient(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::transient(format!("Failed to read response: {}", e.without_url())))?;

        if !status.is_success() {
            tracing::debug!(
                "Cloudflare {} failed with {}: {}",
                operation,
                status,
                truncate_for_log(&body)
            );
            return Err(classify_status(status, retry_after, &body));
        }

        let envelope: CloudflareResponse<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::debug!("Undecodable Cloudflare {} body: {}", operation, truncate_for_log(&body));
            ProviderError::malformed(format!("{}: {}", operation, e))
        })?;

        if !envelope.success {
            return Err(classify_envelope(&envelope.errors));
        }
        Ok(envelope)
    }

    fn into_result<T>(envelope: CloudflareResponse<T>, operation: &str) -> Result<T, ProviderError> {
        envelope
            .result
            .ok_or_else(|| ProviderError::malformed(format!("{}: response has no result", operation)))
    }

    fn into_record(wire: WireRecord, operation: &str) -> Result<DnsRecord, ProviderError> {
        let record_type = wire.record_type.clone();
        wire.into_record().ok_or_else(|| {
            ProviderError::malformed(format!("{}: unexpected record type {}", operation, record_type))
        })
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord, ProviderError> {
        let request = self.client.get(self.record_url(zone_id, record_id));
        let envelope = self.send::<WireRecord>(request, "get record").await?;
        Self::into_record(Self::into_result(envelope, "get record")?, "get record")
    }
}

/// Apply a patch to a record locally (dry-run result)
fn patched(mut record: DnsRecord, patch: &RecordPatch) -> DnsRecord {
    if let Some(content) = &patch.content {
        record.content = content.clone();
    }
    if let Some(ttl) = patch.ttl {
        record.ttl = ttl;
    }
    if let Some(proxied) = patch.proxied {
        record.proxied = proxied;
    }
    if patch.priority.is_some() {
        record.priority = patch.priority;
    }
    record
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// ```http
    /// GET /zones/:zone_id/dns_records?page=1&per_page=100&name=www.example.com&type=A
    /// ```
    async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
        page: u32,
    ) -> Result<Page<DnsRecord>, ProviderError> {
        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", RECORDS_PER_PAGE.to_string()),
        ];
        if let Some(name) = &filter.name {
            query.push(("name", name.clone()));
        }
        if let Some(record_type) = filter.record_type {
            query.push(("type", record_type.as_str().to_string()));
        }

        tracing::debug!("Listing records in zone {} (page {}, filter {:?})", zone_id, page, filter);

        let request = self.client.get(self.records_url(zone_id)).query(&query);
        let envelope = self.send::<Vec<WireRecord>>(request, "list records").await?;
        let total_pages = envelope.total_pages();

        let items = Self::into_result(envelope, "list records")?
            .into_iter()
            .filter_map(|wire| {
                let record_type = wire.record_type.clone();
                let record = wire.into_record();
                if record.is_none() {
                    tracing::debug!("Skipping unmanaged record type {}", record_type);
                }
                record
            })
            .collect();

        Ok(Page { items, total_pages })
    }

    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// ```
    async fn create_record(&self, zone_id: &str, spec: &RecordSpec) -> Result<DnsRecord, ProviderError> {
        let body = create_body(spec)?;

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.records_url(zone_id),
                body
            );
            return Ok(DnsRecord {
                id: "dry-run".to_string(),
                name: spec.name.clone(),
                record_type: spec.record_type,
                content: spec.content.clone(),
                ttl: spec.ttl,
                proxied: spec.proxied,
                priority: spec.priority,
                created_on: None,
                modified_on: None,
            });
        }

        let request = self.client.post(self.records_url(zone_id)).json(&body);
        let envelope = self.send::<WireRecord>(request, "create record").await?;
        Self::into_record(Self::into_result(envelope, "create record")?, "create record")
    }

    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// ```
    ///
    /// In dry-run mode the record is fetched and the patch applied locally.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        patch: &RecordPatch,
    ) -> Result<DnsRecord, ProviderError> {
        let body = patch_body(patch)?;
        let url = self.record_url(zone_id, record_id);

        if self.dry_run {
            let current = self.get_record(zone_id, record_id).await?;
            tracing::info!("[DRY-RUN] Would send PATCH request to {} with payload: {}", url, body);
            return Ok(patched(current, patch));
        }

        let request = self.client.patch(url).json(&body);
        let envelope = self.send::<WireRecord>(request, "update record").await?;
        Self::into_record(Self::into_result(envelope, "update record")?, "update record")
    }

    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError> {
        let url = self.record_url(zone_id, record_id);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        let request = self.client.delete(url);
        self.send::<serde_json::Value>(request, "delete record").await?;
        Ok(())
    }

    /// ```http
    /// GET /zones?page=1&per_page=50
    /// ```
    async fn list_zones(&self, page: u32) -> Result<Page<Zone>, ProviderError> {
        let query = [
            ("page", page.to_string()),
            ("per_page", ZONES_PER_PAGE.to_string()),
        ];
        let request = self.client.get(format!("{}/zones", self.base_url)).query(&query);
        let envelope = self.send::<Vec<WireZone>>(request, "list zones").await?;
        let total_pages = envelope.total_pages();

        let items = Self::into_result(envelope, "list zones")?
            .into_iter()
            .map(Zone::from)
            .collect();
        Ok(Page { items, total_pages })
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>, Error> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                dry_run,
                http_timeout_secs,
            } => {
                if *dry_run {
                    tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
                }

                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    *dry_run,
                    Duration::from_secs(*http_timeout_secs),
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dnsbot_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dnsbot_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &dnsbot_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
