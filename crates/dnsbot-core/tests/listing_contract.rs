//! Contract Test: Read-Only Commands
//!
//! Constraints verified:
//! - /list, /search and /export never call a mutating provider method
//! - Type filters are applied to listing and export alike
//! - /export produces a JSON array in the documented shape

mod common;

use common::*;
use dnsbot_core::model::ExportEntry;
use dnsbot_core::{RecordType, Reply};
use std::sync::Arc;

fn seeded() -> Arc<ScriptedProvider> {
    let provider = Arc::new(ScriptedProvider::standard());
    provider.seed("www.example.com", RecordType::A, "1.2.3.4");
    provider.seed("api.example.com", RecordType::A, "1.2.3.5");
    provider.seed("example.com", RecordType::Mx, "mail.example.com");
    provider.seed("_dmarc.example.com", RecordType::Txt, "v=DMARC1; p=none");
    provider
}

fn assert_read_only(provider: &ScriptedProvider) {
    assert_eq!(provider.calls(Op::Create), 0);
    assert_eq!(provider.calls(Op::Update), 0);
    assert_eq!(provider.calls(Op::Delete), 0);
}

#[tokio::test]
async fn list_with_type_filter_returns_only_that_type() {
    let provider = seeded();
    let engine = engine(provider.clone());

    match engine.handle(&msg(1, "/list a")).await {
        Reply::Records { zone, record_type, records } => {
            assert_eq!(zone.id, "zone-1");
            assert_eq!(record_type, Some(RecordType::A));
            let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["api.example.com", "www.example.com"]);
        }
        other => panic!("expected Records, got {other:?}"),
    }
    assert_read_only(&provider);
}

#[tokio::test]
async fn search_matches_name_fragments_ignoring_case() {
    let provider = seeded();
    let engine = engine(provider.clone());

    match engine.handle(&msg(1, "/search WW")).await {
        Reply::SearchResults { query, records } => {
            assert_eq!(query, "WW");
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].name, "www.example.com");
        }
        other => panic!("expected SearchResults, got {other:?}"),
    }

    match engine.handle(&msg(1, "/search nothing-here")).await {
        Reply::SearchResults { records, .. } => assert!(records.is_empty()),
        other => panic!("expected SearchResults, got {other:?}"),
    }
    assert_read_only(&provider);
}

#[tokio::test]
async fn export_is_a_json_array_of_entries() {
    let provider = seeded();
    let engine = engine(provider.clone());

    let (zone, count, json) = match engine.handle(&msg(1, "/export")).await {
        Reply::Export { zone, count, json } => (zone, count, json),
        other => panic!("expected Export, got {other:?}"),
    };
    assert_eq!(zone, "example.com");
    assert_eq!(count, 4);

    let entries: Vec<ExportEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(entries.len(), 4);
    let mx = entries.iter().find(|e| e.record_type == RecordType::Mx).unwrap();
    assert_eq!(mx.priority, Some(10));
    assert_eq!(mx.ttl, 1);
    assert!(json.contains("\"type\": \"TXT\""));
    assert_read_only(&provider);
}

#[tokio::test]
async fn export_honours_the_type_filter() {
    let provider = seeded();
    let engine = engine(provider.clone());

    match engine.handle(&msg(1, "/export txt")).await {
        Reply::Export { count, json, .. } => {
            assert_eq!(count, 1);
            assert!(json.contains("v=DMARC1; p=none"));
            assert!(!json.contains("\"priority\""));
        }
        other => panic!("expected Export, got {other:?}"),
    }
}
