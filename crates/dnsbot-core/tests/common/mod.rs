//! Test doubles and common utilities for contract tests
//!
//! [`ScriptedProvider`] is an in-memory zone that counts every call, can be
//! told to fail the next N calls of one operation, and can hold record
//! listings behind a gate so tests can observe concurrency.

#![allow(dead_code)]

use async_trait::async_trait;
use dnsbot_core::config::{FlowConfig, RetryConfig};
use dnsbot_core::{
    CommandEngine, ContextId, DnsProvider, DnsRecord, InboundMessage, Page, ProviderClient,
    ProviderError, RecordFilter, RecordPatch, RecordSpec, RecordType, Ttl, UserId, Zone,
    ZoneContexts,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Provider operations, for fault injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Update,
    Delete,
    Zones,
}

/// What an injected fault does
#[derive(Debug, Clone)]
pub enum Fault {
    /// Fail without touching state
    Fail(ProviderError),
    /// Apply the change, then report failure (lost response)
    LandThenFail(ProviderError),
}

/// In-memory provider with call counters and fault injection
pub struct ScriptedProvider {
    records: Mutex<Vec<DnsRecord>>,
    zones: Vec<Zone>,
    next_id: AtomicUsize,
    calls: Mutex<HashMap<Op, usize>>,
    faults: Mutex<HashMap<Op, VecDeque<Fault>>>,
    page_size: usize,
    gate: watch::Sender<bool>,
    lists_entered: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(zones: Vec<Zone>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            records: Mutex::new(Vec::new()),
            zones,
            next_id: AtomicUsize::new(1),
            calls: Mutex::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
            page_size: 100,
            gate,
            lists_entered: AtomicUsize::new(0),
        }
    }

    /// Provider with the standard test zones
    pub fn standard() -> Self {
        Self::new(vec![zone(), other_zone()])
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Seed a record and return its id
    pub fn seed(&self, name: &str, record_type: RecordType, content: &str) -> String {
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(DnsRecord {
            id: id.clone(),
            name: name.to_string(),
            record_type,
            content: content.to_string(),
            ttl: Ttl::Auto,
            proxied: false,
            priority: record_type.has_priority().then_some(10),
            created_on: None,
            modified_on: None,
        });
        id
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn record(&self, id: &str) -> Option<DnsRecord> {
        self.records().into_iter().find(|r| r.id == id)
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Queue `times` copies of `fault` for the next calls of `op`
    pub fn inject(&self, op: Op, fault: Fault, times: usize) {
        let mut faults = self.faults.lock().unwrap();
        let queue = faults.entry(op).or_default();
        for _ in 0..times {
            queue.push_back(fault.clone());
        }
    }

    /// Make record listings wait until [`open_gate`](Self::open_gate)
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// Number of listings that have started (gated or not)
    pub fn lists_entered(&self) -> usize {
        self.lists_entered.load(Ordering::SeqCst)
    }

    fn record_call(&self, op: Op) -> Option<Fault> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        self.faults
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
    }

    fn page<T: Clone>(&self, items: Vec<T>, page: u32) -> Page<T> {
        let total_pages = items.len().div_ceil(self.page_size).max(1) as u32;
        let start = (page.saturating_sub(1) as usize) * self.page_size;
        Page {
            items: items.into_iter().skip(start).take(self.page_size).collect(),
            total_pages,
        }
    }
}

#[async_trait]
impl DnsProvider for ScriptedProvider {
    async fn list_records(
        &self,
        _zone_id: &str,
        filter: &RecordFilter,
        page: u32,
    ) -> Result<Page<DnsRecord>, ProviderError> {
        self.lists_entered.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if let Some(Fault::Fail(error) | Fault::LandThenFail(error)) = self.record_call(Op::List) {
            return Err(error);
        }

        let matching: Vec<DnsRecord> = self
            .records()
            .into_iter()
            .filter(|r| filter.name.as_ref().is_none_or(|n| r.name.eq_ignore_ascii_case(n)))
            .filter(|r| filter.record_type.is_none_or(|t| r.record_type == t))
            .collect();
        Ok(self.page(matching, page))
    }

    async fn create_record(
        &self,
        _zone_id: &str,
        spec: &RecordSpec,
    ) -> Result<DnsRecord, ProviderError> {
        let fault = self.record_call(Op::Create);
        if let Some(Fault::Fail(error)) = fault {
            return Err(error);
        }

        if self.records().iter().any(|r| spec.matches(r)) {
            return Err(ProviderError::rejected("An identical record already exists."));
        }

        let record = DnsRecord {
            id: format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            name: spec.name.clone(),
            record_type: spec.record_type,
            content: spec.content.clone(),
            ttl: spec.ttl,
            proxied: spec.proxied,
            priority: spec.priority,
            created_on: None,
            modified_on: None,
        };
        self.records.lock().unwrap().push(record.clone());

        match fault {
            Some(Fault::LandThenFail(error)) => Err(error),
            _ => Ok(record),
        }
    }

    async fn update_record(
        &self,
        _zone_id: &str,
        record_id: &str,
        patch: &RecordPatch,
    ) -> Result<DnsRecord, ProviderError> {
        let fault = self.record_call(Op::Update);
        if let Some(Fault::Fail(error)) = fault {
            return Err(error);
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| ProviderError::not_found(format!("record {record_id}")))?;

        if let Some(content) = &patch.content {
            record.content = content.clone();
        }
        if let Some(ttl) = patch.ttl {
            record.ttl = ttl;
        }
        if let Some(proxied) = patch.proxied {
            record.proxied = proxied;
        }
        if let Some(priority) = patch.priority {
            record.priority = Some(priority);
        }
        let updated = record.clone();

        match fault {
            Some(Fault::LandThenFail(error)) => Err(error),
            _ => Ok(updated),
        }
    }

    async fn delete_record(&self, _zone_id: &str, record_id: &str) -> Result<(), ProviderError> {
        let fault = self.record_call(Op::Delete);
        if let Some(Fault::Fail(error)) = fault {
            return Err(error);
        }

        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(ProviderError::not_found(format!("record {record_id}")));
        }

        match fault {
            Some(Fault::LandThenFail(error)) => Err(error),
            _ => Ok(()),
        }
    }

    async fn list_zones(&self, page: u32) -> Result<Page<Zone>, ProviderError> {
        if let Some(Fault::Fail(error) | Fault::LandThenFail(error)) = self.record_call(Op::Zones) {
            return Err(error);
        }
        Ok(self.page(self.zones.clone(), page))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn zone() -> Zone {
    Zone {
        id: "zone-1".to_string(),
        name: "example.com".to_string(),
        status: Some("active".to_string()),
    }
}

pub fn other_zone() -> Zone {
    Zone {
        id: "zone-2".to_string(),
        name: "example.org".to_string(),
        status: Some("active".to_string()),
    }
}

/// Retry policy with millisecond delays and no jitter
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
        jitter_ms: 0,
        attempt_timeout_secs: 5,
        total_budget_secs: 10,
    }
}

/// Engine over `provider`, starting every context in [`zone`]
pub fn engine(provider: Arc<ScriptedProvider>) -> CommandEngine {
    engine_with(provider, Some(zone()), FlowConfig::default())
}

pub fn engine_with(
    provider: Arc<ScriptedProvider>,
    default_zone: Option<Zone>,
    flow: FlowConfig,
) -> CommandEngine {
    let client = ProviderClient::new(provider, fast_retry());
    CommandEngine::new(client, ZoneContexts::new(default_zone), flow)
}

/// Message from `user` in that user's own context
pub fn msg(user: i64, text: &str) -> InboundMessage {
    InboundMessage::new(UserId(user), ContextId(user), text)
}
