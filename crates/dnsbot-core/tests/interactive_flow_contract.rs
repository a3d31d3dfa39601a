//! Contract Test: Per-User Interactive Flows
//!
//! Constraints verified:
//! - Underspecified commands collect missing fields over several messages
//! - Invalid replies re-prompt without advancing, up to a bounded count
//! - Cancel, decline and expiry all return the user to idle
//! - A new slash command supersedes an unfinished flow, visibly
//! - Expiry is checked when a message arrives, with the deadline pushed out
//!   by every accepted reply

mod common;

use chrono::{Duration, Utc};
use common::*;
use dnsbot_core::config::FlowConfig;
use dnsbot_core::{
    CommandKind, Field, FlowError, Operation, ParseError, RecordType, Reply, Ttl,
};
use std::sync::Arc;

#[tokio::test]
async fn add_collected_over_four_messages() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    assert_eq!(
        engine.handle(&msg(1, "/add")).await,
        Reply::Prompt { command: CommandKind::Add, field: Field::Name }
    );
    assert_eq!(
        engine.handle(&msg(1, "myhost")).await,
        Reply::Prompt { command: CommandKind::Add, field: Field::RecordType }
    );
    assert_eq!(
        engine.handle(&msg(1, "A")).await,
        Reply::Prompt { command: CommandKind::Add, field: Field::Content }
    );

    let reply = engine.handle(&msg(1, "9.9.9.9")).await;
    match reply {
        Reply::Created(record) => {
            assert_eq!(record.name, "myhost.example.com");
            assert_eq!(record.record_type, RecordType::A);
            assert_eq!(record.content, "9.9.9.9");
            assert_eq!(record.ttl, Ttl::Auto);
            assert!(!record.proxied);
        }
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(provider.calls(Op::Create), 1);

    // Back to idle
    assert_eq!(engine.handle(&msg(1, "/cancel")).await, Reply::NothingToCancel);
}

#[tokio::test]
async fn partial_command_only_asks_for_what_is_missing() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    assert_eq!(
        engine.handle(&msg(1, "/add www CNAME")).await,
        Reply::Prompt { command: CommandKind::Add, field: Field::Content }
    );
    let reply = engine.handle(&msg(1, "example.com.")).await;
    assert!(matches!(reply, Reply::Created(ref r) if r.content == "example.com"));
}

#[tokio::test]
async fn invalid_reply_re_prompts_the_same_field() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/add")).await;
    engine.handle(&msg(1, "myhost")).await;

    assert_eq!(
        engine.handle(&msg(1, "SOA")).await,
        Reply::Retry {
            error: ParseError::InvalidType("SOA".into()),
            field: Field::RecordType,
        }
    );
    assert_eq!(
        engine.handle(&msg(1, "AAAA")).await,
        Reply::Prompt { command: CommandKind::Add, field: Field::Content }
    );

    let reply = engine.handle(&msg(1, "1.2.3.4")).await;
    assert!(matches!(
        reply,
        Reply::Retry { error: ParseError::InvalidContentShape { record_type: RecordType::Aaaa, .. }, .. }
    ));

    let reply = engine.handle(&msg(1, "2001:db8::1")).await;
    assert!(matches!(reply, Reply::Created(ref r) if r.record_type == RecordType::Aaaa));
}

#[tokio::test]
async fn too_many_invalid_replies_abandon_the_flow() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/add")).await;
    assert!(matches!(engine.handle(&msg(1, "bad name")).await, Reply::Retry { .. }));
    assert!(matches!(engine.handle(&msg(1, "bad name")).await, Reply::Retry { .. }));
    assert_eq!(
        engine.handle(&msg(1, "bad name")).await,
        Reply::FlowEnded(FlowError::RetryLimitExceeded)
    );

    // Session is gone: plain text is now read as a command
    assert!(matches!(
        engine.handle(&msg(1, "myhost")).await,
        Reply::Invalid(ParseError::UnknownCommand(_))
    ));
    assert_eq!(provider.calls(Op::Create), 0);
}

#[tokio::test]
async fn cancel_discards_the_flow() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/add")).await;
    engine.handle(&msg(1, "myhost")).await;

    assert_eq!(
        engine.handle(&msg(1, "/cancel")).await,
        Reply::FlowEnded(FlowError::Cancelled)
    );
    assert!(matches!(engine.handle(&msg(1, "A")).await, Reply::Invalid(_)));
    assert_eq!(provider.calls(Op::Create), 0);
}

#[tokio::test]
async fn expired_session_is_reported_and_discarded() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());
    let t0 = Utc::now();

    engine.handle_at(&msg(1, "/add"), t0).await;

    let late = t0 + Duration::seconds(301);
    assert_eq!(
        engine.handle_at(&msg(1, "myhost"), late).await,
        Reply::FlowEnded(FlowError::SessionExpired)
    );
    assert!(matches!(
        engine.handle_at(&msg(1, "myhost"), late).await,
        Reply::Invalid(ParseError::UnknownCommand(_))
    ));
}

#[tokio::test]
async fn command_after_expiry_runs_fresh() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());
    let t0 = Utc::now();

    engine.handle_at(&msg(1, "/add"), t0).await;

    let reply = engine.handle_at(&msg(1, "/list"), t0 + Duration::seconds(600)).await;
    assert!(matches!(reply, Reply::Records { .. }), "got {reply:?}");
}

#[tokio::test]
async fn accepted_input_pushes_the_deadline_out() {
    let provider = Arc::new(ScriptedProvider::standard());
    let flow = FlowConfig { session_ttl_secs: 300, max_invalid_inputs: 3 };
    let engine = engine_with(provider.clone(), Some(zone()), flow);
    let t0 = Utc::now();

    engine.handle_at(&msg(1, "/add"), t0).await;
    engine.handle_at(&msg(1, "myhost"), t0 + Duration::seconds(200)).await;

    assert_eq!(
        engine.handle_at(&msg(1, "A"), t0 + Duration::seconds(400)).await,
        Reply::Prompt { command: CommandKind::Add, field: Field::Content }
    );
}

#[tokio::test]
async fn confirming_state_expires_too() {
    let provider = Arc::new(ScriptedProvider::standard());
    provider.seed("sub.example.com", RecordType::A, "1.2.3.4");
    let engine = engine(provider.clone());
    let t0 = Utc::now();

    let reply = engine.handle_at(&msg(1, "/delete sub"), t0).await;
    assert!(matches!(reply, Reply::Confirm { .. }));

    assert_eq!(
        engine.handle_at(&msg(1, "yes"), t0 + Duration::seconds(301)).await,
        Reply::FlowEnded(FlowError::SessionExpired)
    );
    assert_eq!(provider.calls(Op::Delete), 0);
    assert_eq!(provider.records().len(), 1);
}

#[tokio::test]
async fn new_command_supersedes_unfinished_flow() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/add")).await;

    match engine.handle(&msg(1, "/zones")).await {
        Reply::Superseded { previous, reply } => {
            assert_eq!(previous, CommandKind::Add);
            assert!(matches!(*reply, Reply::Zones { .. }));
        }
        other => panic!("expected Superseded, got {other:?}"),
    }

    // The old flow is gone
    assert!(matches!(engine.handle(&msg(1, "myhost")).await, Reply::Invalid(_)));
}

#[tokio::test]
async fn superseding_command_can_start_its_own_flow() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/add")).await;

    let reply = engine.handle(&msg(1, "/delete")).await;
    assert!(reply.awaits_input());
    assert!(matches!(
        reply,
        Reply::Superseded { previous: CommandKind::Add, ref reply }
            if **reply == Reply::Prompt { command: CommandKind::Delete, field: Field::Name }
    ));
}

#[tokio::test]
async fn declined_confirmation_changes_nothing() {
    let provider = Arc::new(ScriptedProvider::standard());
    provider.seed("sub.example.com", RecordType::A, "1.2.3.4");
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/delete sub")).await;
    assert_eq!(engine.handle(&msg(1, "no")).await, Reply::Discarded);

    assert_eq!(provider.calls(Op::Delete), 0);
    assert_eq!(provider.records().len(), 1);
}

#[tokio::test]
async fn unclear_confirmation_asks_again() {
    let provider = Arc::new(ScriptedProvider::standard());
    provider.seed("sub.example.com", RecordType::A, "1.2.3.4");
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/delete sub")).await;
    assert_eq!(engine.handle(&msg(1, "maybe")).await, Reply::BadConfirmation);
    assert!(matches!(engine.handle(&msg(1, "y")).await, Reply::Deleted(_)));
    assert!(provider.records().is_empty());
}

#[tokio::test]
async fn interactive_update_asks_for_confirmation() {
    let provider = Arc::new(ScriptedProvider::standard());
    let id = provider.seed("sub.example.com", RecordType::A, "1.2.3.4");
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/update")).await;
    assert_eq!(
        engine.handle(&msg(1, "sub")).await,
        Reply::Prompt { command: CommandKind::Update, field: Field::Content }
    );

    let reply = engine.handle(&msg(1, "5.6.7.8")).await;
    assert!(matches!(
        reply,
        Reply::Confirm { operation: Operation::Update { .. }, ref record } if record.id == id
    ));
    assert_eq!(provider.calls(Op::Update), 0);

    let reply = engine.handle(&msg(1, "yes")).await;
    assert!(matches!(reply, Reply::Updated { ref after, .. } if after.content == "5.6.7.8"));
}

#[tokio::test]
async fn bad_update_content_asks_again_for_the_same_record() {
    let provider = Arc::new(ScriptedProvider::standard());
    let id = provider.seed("sub.example.com", RecordType::A, "1.2.3.4");
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/update")).await;
    engine.handle(&msg(1, "sub")).await;

    let reply = engine.handle(&msg(1, "not-an-ip")).await;
    assert!(matches!(
        reply,
        Reply::Retry {
            error: ParseError::InvalidContentShape { record_type: RecordType::A, .. },
            field: Field::Content,
        }
    ));
    let lookups = provider.calls(Op::List);

    let reply = engine.handle(&msg(1, "5.6.7.8")).await;
    assert!(matches!(
        reply,
        Reply::Confirm { operation: Operation::Update { .. }, ref record } if record.id == id
    ));
    assert_eq!(provider.calls(Op::List), lookups, "target is not looked up again");

    let reply = engine.handle(&msg(1, "yes")).await;
    assert!(matches!(reply, Reply::Updated { ref after, .. } if after.content == "5.6.7.8"));
}

#[tokio::test]
async fn bad_update_content_counts_toward_the_retry_limit() {
    let provider = Arc::new(ScriptedProvider::standard());
    provider.seed("sub.example.com", RecordType::A, "1.2.3.4");
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/update")).await;
    engine.handle(&msg(1, "sub")).await;

    assert!(matches!(engine.handle(&msg(1, "not-an-ip")).await, Reply::Retry { .. }));
    assert!(matches!(engine.handle(&msg(1, "still-not")).await, Reply::Retry { .. }));
    assert_eq!(
        engine.handle(&msg(1, "nope")).await,
        Reply::FlowEnded(FlowError::RetryLimitExceeded)
    );

    assert!(matches!(
        engine.handle(&msg(1, "5.6.7.8")).await,
        Reply::Invalid(ParseError::UnknownCommand(_))
    ));
    assert_eq!(provider.calls(Op::Update), 0);
    assert_eq!(provider.records()[0].content, "1.2.3.4");
}

#[tokio::test]
async fn quoted_reply_matches_quoted_command_token() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/add note TXT")).await;
    let reply = engine.handle(&msg(1, r#""v=spf1 -all""#)).await;
    assert!(matches!(reply, Reply::Created(ref r) if r.content == "v=spf1 -all"));

    let reply = engine.handle(&msg(1, r#"/add other TXT "v=spf1 -all""#)).await;
    assert!(matches!(reply, Reply::Created(ref r) if r.content == "v=spf1 -all"));
}

#[tokio::test]
async fn flows_are_per_user() {
    let provider = Arc::new(ScriptedProvider::standard());
    let engine = engine(provider.clone());

    engine.handle(&msg(1, "/add")).await;

    // User 2 has no session; their plain text is not fed into user 1's flow
    assert!(matches!(engine.handle(&msg(2, "myhost")).await, Reply::Invalid(_)));
    assert_eq!(
        engine.handle(&msg(1, "myhost")).await,
        Reply::Prompt { command: CommandKind::Add, field: Field::RecordType }
    );
}
