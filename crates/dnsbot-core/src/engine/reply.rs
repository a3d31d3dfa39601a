//! Structured engine output
//!
//! The engine never formats text. Transports render a [`Reply`] however
//! suits them.

use crate::command::{CommandKind, Field, Operation};
use crate::error::{FlowError, ParseError, ProviderError};
use crate::model::{DnsRecord, RecordType, Zone};

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Usage guide requested
    Help,

    /// Ask for the next missing field
    Prompt { command: CommandKind, field: Field },

    /// The reply to a prompt was invalid; ask again
    Retry { error: ParseError, field: Field },

    /// The command line itself was invalid
    Invalid(ParseError),

    Records {
        zone: Zone,
        record_type: Option<RecordType>,
        records: Vec<DnsRecord>,
    },

    SearchResults {
        query: String,
        records: Vec<DnsRecord>,
    },

    /// Every record under one name
    Details { name: String, records: Vec<DnsRecord> },

    Created(DnsRecord),

    Updated { before: DnsRecord, after: DnsRecord },

    /// The update would change nothing; no provider call was made
    Unchanged(DnsRecord),

    Deleted(DnsRecord),

    /// Several records match; the user must pick one
    Choose {
        command: CommandKind,
        candidates: Vec<DnsRecord>,
    },

    /// Selection reply matched no single candidate
    BadChoice { options: usize },

    /// Ask for a yes/no before applying `operation` to `record`
    Confirm {
        operation: Operation,
        record: DnsRecord,
    },

    /// Confirmation reply was neither yes nor no
    BadConfirmation,

    Zones {
        zones: Vec<Zone>,
        /// Id of the context's active zone
        current: Option<String>,
    },

    ZoneSwitched(Zone),

    /// Pretty-printed JSON of the zone's records
    Export { zone: String, count: usize, json: String },

    /// A record command arrived with no active zone
    NoZoneSelected,

    /// The user declined a confirmation
    Discarded,

    /// `/cancel` with no flow in progress
    NothingToCancel,

    FlowEnded(FlowError),

    Failed(ProviderError),

    /// A new command replaced an unfinished flow
    Superseded {
        previous: CommandKind,
        reply: Box<Reply>,
    },
}

impl Reply {
    /// Whether this reply leaves the user mid-flow
    pub fn awaits_input(&self) -> bool {
        match self {
            Reply::Prompt { .. }
            | Reply::Retry { .. }
            | Reply::Choose { .. }
            | Reply::BadChoice { .. }
            | Reply::Confirm { .. }
            | Reply::BadConfirmation => true,
            Reply::Superseded { reply, .. } => reply.awaits_input(),
            _ => false,
        }
    }
}

impl From<ProviderError> for Reply {
    fn from(error: ProviderError) -> Self {
        Reply::Failed(error)
    }
}

impl From<ParseError> for Reply {
    fn from(error: ParseError) -> Self {
        Reply::Invalid(error)
    }
}
