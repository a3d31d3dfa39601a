//! Active zone per operating context
//!
//! Each context (one chat, one console) has its own active zone, starting at
//! the configured default. Callers clone the zone once at the start of a
//! command and use that copy throughout, so a concurrent switch is never
//! observed half-way.

use crate::client::ProviderClient;
use crate::error::ProviderError;
use crate::model::{ContextId, Zone};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Find a zone by id, or by domain name ignoring case and a trailing dot
pub fn find_zone<'a>(zones: &'a [Zone], target: &str) -> Option<&'a Zone> {
    let target = target.trim();
    let domain = target.trim_end_matches('.');
    zones
        .iter()
        .find(|zone| zone.id == target)
        .or_else(|| zones.iter().find(|zone| zone.name.eq_ignore_ascii_case(domain)))
}

/// Look a zone up against the provider's zone listing
pub async fn lookup_zone(client: &ProviderClient, target: &str) -> Result<Zone, ProviderError> {
    let zones = client.list_zones().await?;
    find_zone(&zones, target)
        .cloned()
        .ok_or_else(|| ProviderError::not_found(format!("zone {}", target.trim())))
}

/// Per-context active zone
#[derive(Debug, Default)]
pub struct ZoneContexts {
    default: Option<Zone>,
    active: RwLock<HashMap<ContextId, Zone>>,
}

impl ZoneContexts {
    /// Contexts that start in `default` (already validated by the caller)
    pub fn new(default: Option<Zone>) -> Self {
        Self {
            default,
            active: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_zone(&self) -> Option<&Zone> {
        self.default.as_ref()
    }

    /// Active zone for `context`, if any
    pub async fn current(&self, context: ContextId) -> Option<Zone> {
        let active = self.active.read().await;
        active.get(&context).or(self.default.as_ref()).cloned()
    }

    /// Switch `context` to the zone with id or domain `target`
    ///
    /// The provider is asked before anything changes. An unknown zone
    /// returns `NotFound` and leaves the context as it was.
    pub async fn switch(
        &self,
        context: ContextId,
        target: &str,
        client: &ProviderClient,
    ) -> Result<Zone, ProviderError> {
        let zone = lookup_zone(client, target).await?;

        self.active.write().await.insert(context, zone.clone());
        info!(context = %context, zone = %zone.name, zone_id = %zone.id, "Active zone switched");

        Ok(zone)
    }
}
