//! Console line transport
//!
//! Stands in for a chat transport: every stdin line is one inbound message
//! from the configured operator, in a context of its own. The access gate
//! runs here, before the engine sees anything.

use crate::render::render;
use dnsbot_core::{AccessPolicy, CommandEngine, ContextId, InboundMessage, UserId};
use tracing::{debug, warn};

pub struct Console<P> {
    engine: CommandEngine,
    policy: P,
    operator: UserId,
}

impl<P: AccessPolicy> Console<P> {
    pub fn new(engine: CommandEngine, policy: P, operator: UserId) -> Self {
        Self {
            engine,
            policy,
            operator,
        }
    }

    /// Handle one input line; `None` for blank lines
    pub async fn dispatch(&self, line: &str) -> Option<String> {
        let text = line.trim();
        if text.is_empty() {
            return None;
        }

        if !self.policy.is_allowed(self.operator) {
            warn!("Unauthorized access attempt from user ID: {}", self.operator);
            return Some("Unauthorized. You are not allowed to use this bot.".to_string());
        }

        debug!("Console message from {}: {}", self.operator, text);
        let message = InboundMessage::new(self.operator, ContextId(self.operator.0), text);
        let reply = self.engine.handle(&message).await;
        Some(render(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dnsbot_core::{
        AllowList, DnsProvider, DnsRecord, FlowConfig, Page, ProviderClient, ProviderError, RecordFilter,
        RecordPatch, RecordSpec, RetryConfig, Zone, ZoneContexts,
    };
    use std::sync::Arc;

    // Every line dispatched in these tests stops before a provider call
    struct Offline;

    #[async_trait]
    impl DnsProvider for Offline {
        async fn list_records(&self, _: &str, _: &RecordFilter, _: u32) -> Result<Page<DnsRecord>, ProviderError> {
            Err(ProviderError::transient("offline"))
        }
        async fn create_record(&self, _: &str, _: &RecordSpec) -> Result<DnsRecord, ProviderError> {
            Err(ProviderError::transient("offline"))
        }
        async fn update_record(&self, _: &str, _: &str, _: &RecordPatch) -> Result<DnsRecord, ProviderError> {
            Err(ProviderError::transient("offline"))
        }
        async fn delete_record(&self, _: &str, _: &str) -> Result<(), ProviderError> {
            Err(ProviderError::transient("offline"))
        }
        async fn list_zones(&self, _: u32) -> Result<Page<Zone>, ProviderError> {
            Err(ProviderError::transient("offline"))
        }
        fn provider_name(&self) -> &'static str {
            "offline"
        }
    }

    fn console(allowed: &[i64]) -> Console<AllowList> {
        let client = ProviderClient::new(Arc::new(Offline), RetryConfig::default());
        let engine = CommandEngine::new(client, ZoneContexts::new(None), FlowConfig::default());
        Console::new(engine, AllowList::new(allowed.iter().copied().map(UserId)), UserId(42))
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        assert_eq!(console(&[42]).dispatch("   ").await, None);
    }

    #[tokio::test]
    async fn operator_outside_allow_list_is_refused() {
        let reply = console(&[7]).dispatch("/help").await.unwrap();
        assert!(reply.starts_with("Unauthorized"));
    }

    #[tokio::test]
    async fn allowed_operator_reaches_the_engine() {
        let console = console(&[42]);

        let help = console.dispatch("/help").await.unwrap();
        assert!(help.contains("/zones"));

        let reply = console.dispatch("/list").await.unwrap();
        assert!(reply.starts_with("No zone selected"));
    }

    #[tokio::test]
    async fn flows_continue_across_lines() {
        let console = console(&[42]);

        assert_eq!(console.dispatch("/add").await.unwrap(), "/add: send the record name.");
        assert_eq!(console.dispatch("www").await.unwrap(), "/add: send the record type.");
        assert_eq!(console.dispatch("/cancel").await.unwrap(), "Cancelled. Start again with a command.");
    }
}
