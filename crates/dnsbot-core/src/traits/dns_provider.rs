// # DNS Provider Trait
//
// Defines the interface to a DNS provider's management API.
//
// ## Implementations
//
// - Cloudflare: `dnsbot-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsbot_core::{DnsProvider, RecordFilter};
//
// let provider: Box<dyn DnsProvider> = /* DnsProvider implementation */;
// let page = provider
//     .list_records("zone-id", &RecordFilter::by_name("www.example.com", None), 1)
//     .await?;
// ```

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::model::{DnsRecord, Page, RecordFilter, RecordPatch, RecordSpec, Zone};

/// Trait for DNS provider implementations
///
/// Implementations translate between the provider's wire format and the
/// uniform [`DnsRecord`]/[`Zone`] model and normalize every failure into
/// [`ProviderError`].
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or a classified failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry, back off or sleep (owned by `ProviderClient`)
/// - ❌ Remember the active zone (owned by `ZoneContexts`)
/// - ❌ Follow pagination on their own (owned by `ProviderClient`)
/// - ❌ Spawn tasks or threads
///
/// One trait call is one HTTP request. The client decides whether a failure
/// is worth another attempt, based only on the [`ProviderError`] variant.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch one page of records in a zone
    ///
    /// `filter.name` is an exact fully-qualified name. Pages are 1-indexed.
    async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
        page: u32,
    ) -> Result<Page<DnsRecord>, ProviderError>;

    /// Create a record
    async fn create_record(
        &self,
        zone_id: &str,
        spec: &RecordSpec,
    ) -> Result<DnsRecord, ProviderError>;

    /// Apply a partial update to a record
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        patch: &RecordPatch,
    ) -> Result<DnsRecord, ProviderError>;

    /// Delete a record
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError>;

    /// Fetch one page of zones visible to the credential
    async fn list_zones(&self, page: u32) -> Result<Page<Zone>, ProviderError>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
