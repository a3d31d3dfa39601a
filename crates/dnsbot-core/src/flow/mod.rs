//! Interactive flow state
//!
//! The only cross-message memory in the bot. A user with a pending flow has
//! exactly one [`FlowSession`]; the engine feeds it each plain-text message
//! and drops it on completion, cancel, expiry, or too many bad replies.
//!
//! ```text
//! Idle ──underspecified──▶ Collecting(field) ──valid──▶ Collecting(next)
//!                                │                          │
//!                                └────────last field────────┤
//!                                                           ▼
//!                      Selecting(candidates) ◀──ambiguous── lookup
//!                                │                          │
//!                                ▼                          ▼
//!                      Confirming(record) ──yes──▶ apply ──▶ Idle
//! ```
//!
//! An interactive update whose content does not fit the chosen record's type
//! waits in `Amending(record)` for new content instead of starting over.
//!
//! Expiry is checked when a message arrives; there is no timer.

use crate::command::{CommandKind, Field, Operation, PendingOperation};
use crate::model::{DnsRecord, Zone};
use chrono::{DateTime, Utc};

/// Where a flow currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    /// Waiting for `field`
    Collecting {
        pending: PendingOperation,
        field: Field,
    },
    /// Waiting for the user to pick one of several records
    Selecting {
        operation: Operation,
        zone: Zone,
        candidates: Vec<DnsRecord>,
    },
    /// Waiting for update content that fits `record`'s type
    Amending {
        operation: Operation,
        zone: Zone,
        record: DnsRecord,
    },
    /// Waiting for a yes/no before a mutation
    Confirming {
        operation: Operation,
        zone: Zone,
        record: DnsRecord,
    },
}

impl FlowStep {
    pub fn command(&self) -> CommandKind {
        match self {
            FlowStep::Collecting { pending, .. } => pending.kind(),
            FlowStep::Selecting { operation, .. }
            | FlowStep::Amending { operation, .. }
            | FlowStep::Confirming { operation, .. } => operation.kind(),
        }
    }
}

/// One user's in-progress flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSession {
    pub step: FlowStep,
    /// Fields were gathered over several messages
    pub interactive: bool,
    pub expires_at: DateTime<Utc>,
    /// Bad replies at the current step
    pub invalid_inputs: u32,
}

impl FlowSession {
    /// A fresh session at `step`, expiring `ttl` after `now`
    pub fn new(step: FlowStep, interactive: bool, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            step,
            interactive,
            expires_at: now + ttl,
            invalid_inputs: 0,
        }
    }

    pub fn command(&self) -> CommandKind {
        self.step.command()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Count a bad reply; false once `limit` is reached
    pub fn register_invalid(&mut self, limit: u32) -> bool {
        self.invalid_inputs += 1;
        self.invalid_inputs < limit
    }
}

/// Resolve a selection reply against the candidate list
///
/// Accepts a 1-based index, a record type that matches exactly one
/// candidate, or a record id.
pub fn select_candidate<'a>(candidates: &'a [DnsRecord], input: &str) -> Option<&'a DnsRecord> {
    let input = input.trim();

    if let Ok(index) = input.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| candidates.get(i));
    }

    if let Ok(record_type) = input.parse::<crate::model::RecordType>() {
        let mut of_type = candidates.iter().filter(|r| r.record_type == record_type);
        return match (of_type.next(), of_type.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        };
    }

    candidates.iter().find(|r| r.id == input)
}
