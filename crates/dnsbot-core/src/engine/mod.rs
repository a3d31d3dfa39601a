//! Command engine
//!
//! Entry point for every inbound message that passed the access gate.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ InboundMessage │
//! └────────────────┘
//!         │
//!         ▼
//! ┌────────────────┐   lock user lane, drop expired session
//! │ CommandEngine  │
//! └────────────────┘
//!         │
//!         ├── plain text + session ──▶ flow step (collect / select / confirm)
//!         │
//!         └── otherwise ──▶ resolve ──▶ prompt, or execute
//!                                          │
//!                      ┌───────────────────┼───────────────────┐
//!                      ▼                   ▼                   ▼
//!               ┌─────────────┐   ┌───────────────┐   ┌────────────────┐
//!               │ ZoneContexts│   │ RecordMatcher │   │ ProviderClient │
//!               └─────────────┘   └───────────────┘   └────────────────┘
//! ```
//!
//! ## Ordering
//!
//! The user's lane is held for the whole message, provider calls included.
//! A second message from the same user waits; other users do not.

mod reply;

pub use reply::Reply;

use crate::client::ProviderClient;
use crate::command::{self, Command, Content, ContentMode, Field, Operation, PendingOperation};
use crate::config::FlowConfig;
use crate::error::{FlowError, ParseError, ProviderError};
use crate::flow::{FlowSession, FlowStep, select_candidate};
use crate::matcher::{RecordMatcher, select_one};
use crate::model::{ContextId, DnsRecord, RecordPatch, RecordSpec, UserId, Zone, export_json};
use crate::state::{SessionGuard, SessionStore};
use crate::zone::ZoneContexts;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// One message from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user: UserId,
    /// Channel the message arrived on; selects the active zone
    pub context: ContextId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(user: UserId, context: ContextId, text: impl Into<String>) -> Self {
        Self {
            user,
            context,
            text: text.into(),
        }
    }
}

/// Dispatches messages to the resolver, flow sessions and provider
pub struct CommandEngine {
    client: ProviderClient,
    zones: ZoneContexts,
    sessions: SessionStore,
    flow: FlowConfig,
}

impl CommandEngine {
    pub fn new(client: ProviderClient, zones: ZoneContexts, flow: FlowConfig) -> Self {
        Self {
            client,
            zones,
            sessions: SessionStore::new(),
            flow,
        }
    }

    pub fn zones(&self) -> &ZoneContexts {
        &self.zones
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    /// Handle one message
    pub async fn handle(&self, message: &InboundMessage) -> Reply {
        self.handle_at(message, Utc::now()).await
    }

    /// Handle one message as if it arrived at `now`
    pub async fn handle_at(&self, message: &InboundMessage, now: DateTime<Utc>) -> Reply {
        let mut slot = self.sessions.lock(message.user).await;
        let text = message.text.trim();
        let is_command = text.starts_with('/');

        if let Some(session) = &*slot
            && session.is_expired(now)
        {
            *slot = None;
            debug!(user = %message.user, "Flow session expired");
            if !is_command {
                return Reply::FlowEnded(FlowError::SessionExpired);
            }
        }

        let resolved = match slot.take() {
            Some(session) if !is_command => {
                return self.continue_flow(&mut slot, message, session, text, now).await;
            }
            Some(session) => match command::resolve(text) {
                Ok(Command::Cancel) => {
                    debug!(user = %message.user, command = %session.command(), "Flow cancelled");
                    return Reply::FlowEnded(FlowError::Cancelled);
                }
                resolved => {
                    let reply = self.start(&mut slot, message, resolved, now).await;
                    info!(
                        user = %message.user,
                        previous = %session.command(),
                        "Unfinished flow replaced by a new command"
                    );
                    return Reply::Superseded {
                        previous: session.command(),
                        reply: Box::new(reply),
                    };
                }
            },
            None => command::resolve(text),
        };

        self.start(&mut slot, message, resolved, now).await
    }

    async fn start(
        &self,
        slot: &mut SessionGuard,
        message: &InboundMessage,
        resolved: Result<Command, ParseError>,
        now: DateTime<Utc>,
    ) -> Reply {
        match resolved {
            Err(error) => Reply::Invalid(error),
            Ok(Command::Help) => Reply::Help,
            Ok(Command::Cancel) => Reply::NothingToCancel,
            Ok(Command::Run(operation)) => self.execute(slot, message, operation, false, now).await,
            Ok(Command::Pending(pending)) => self.advance(slot, message, pending, now).await,
        }
    }

    /// Prompt for the next missing field, or run the finished operation
    async fn advance(
        &self,
        slot: &mut SessionGuard,
        message: &InboundMessage,
        pending: PendingOperation,
        now: DateTime<Utc>,
    ) -> Reply {
        match pending.into_operation() {
            Ok(operation) => self.execute(slot, message, operation, true, now).await,
            Err((pending, field)) => {
                let command = pending.kind();
                **slot = Some(self.session(FlowStep::Collecting { pending, field }, true, now));
                Reply::Prompt { command, field }
            }
        }
    }

    async fn continue_flow(
        &self,
        slot: &mut SessionGuard,
        message: &InboundMessage,
        session: FlowSession,
        text: &str,
        now: DateTime<Utc>,
    ) -> Reply {
        let FlowSession { step, interactive, .. } = session.clone();

        match step {
            FlowStep::Collecting { mut pending, field } => {
                match pending.bind(field, &command::unquote(text)) {
                    Ok(()) => self.advance(slot, message, pending, now).await,
                    Err(error) => self.reject(slot, session, Reply::Retry { error, field }),
                }
            }

            FlowStep::Selecting { operation, zone, candidates } => {
                match select_candidate(&candidates, text) {
                    Some(record) => {
                        let record = record.clone();
                        self.target(slot, operation, zone, record, interactive, now).await
                    }
                    None => {
                        let options = candidates.len();
                        self.reject(slot, session, Reply::BadChoice { options })
                    }
                }
            }

            FlowStep::Amending { mut operation, zone, record } => {
                if let Operation::Update { content, .. } = &mut operation {
                    *content = Some(command::unquote(text));
                }
                if let Err(error) = build_patch(&operation, &record) {
                    return self.reject(slot, session, Reply::Retry { error, field: Field::Content });
                }
                self.target(slot, operation, zone, record, interactive, now).await
            }

            FlowStep::Confirming { operation, zone, record } => {
                match command::parse_confirmation(text) {
                    Some(true) => self.apply(&zone, operation, record).await,
                    Some(false) => {
                        debug!(user = %message.user, "Confirmation declined");
                        Reply::Discarded
                    }
                    None => self.reject(slot, session, Reply::BadConfirmation),
                }
            }
        }
    }

    /// Keep the session at its current step, unless that was the last bad reply
    fn reject(&self, slot: &mut SessionGuard, mut session: FlowSession, reply: Reply) -> Reply {
        if !session.register_invalid(self.flow.max_invalid_inputs) {
            info!(command = %session.command(), "Too many invalid replies, flow abandoned");
            return Reply::FlowEnded(FlowError::RetryLimitExceeded);
        }
        **slot = Some(session);
        reply
    }

    fn session(&self, step: FlowStep, interactive: bool, now: DateTime<Utc>) -> FlowSession {
        FlowSession::new(step, interactive, now, self.flow.session_ttl())
    }

    async fn execute(
        &self,
        slot: &mut SessionGuard,
        message: &InboundMessage,
        operation: Operation,
        interactive: bool,
        now: DateTime<Utc>,
    ) -> Reply {
        match operation {
            Operation::ListZones => {
                let current = self.zones.current(message.context).await.map(|z| z.id);
                match self.client.list_zones().await {
                    Ok(zones) => Reply::Zones { zones, current },
                    Err(error) => Reply::Failed(error),
                }
            }
            Operation::SwitchZone { zone } => {
                match self.zones.switch(message.context, &zone, &self.client).await {
                    Ok(zone) => Reply::ZoneSwitched(zone),
                    Err(error) => Reply::Failed(error),
                }
            }
            operation => {
                let Some(zone) = self.zones.current(message.context).await else {
                    return Reply::NoZoneSelected;
                };
                match self.execute_in_zone(slot, message, operation, zone, interactive, now).await {
                    Ok(reply) | Err(reply) => reply,
                }
            }
        }
    }

    async fn execute_in_zone(
        &self,
        slot: &mut SessionGuard,
        message: &InboundMessage,
        operation: Operation,
        zone: Zone,
        interactive: bool,
        now: DateTime<Utc>,
    ) -> Result<Reply, Reply> {
        let matcher = RecordMatcher::new(&self.client, &zone);

        let reply = match operation {
            Operation::List { record_type } => {
                let records = matcher.list(record_type).await?;
                Reply::Records { zone: zone.clone(), record_type, records }
            }

            Operation::Export { record_type } => {
                let records = matcher.list(record_type).await?;
                let json = export_json(&records)
                    .map_err(|e| Reply::Failed(ProviderError::malformed(e.to_string())))?;
                Reply::Export { zone: zone.name.clone(), count: records.len(), json }
            }

            Operation::Search { query } => {
                let records = matcher.search(&query).await?;
                Reply::SearchResults { query, records }
            }

            Operation::Info { name } => {
                let records = matcher.find(&name, None).await?;
                Reply::Details { name: matcher.qualify(&name), records }
            }

            Operation::Add { name, record_type, content, ttl, proxied, priority } => {
                let spec = RecordSpec {
                    name: matcher.qualify(&name),
                    record_type,
                    content,
                    ttl,
                    proxied,
                    priority,
                };
                let record = self.client.create_record(&zone.id, &spec).await?;
                info!(
                    user = %message.user,
                    zone = %zone.name,
                    record = %record.name,
                    record_type = %record.record_type,
                    record_id = %record.id,
                    "Record created"
                );
                Reply::Created(record)
            }

            Operation::Delete { ref name, record_type } => {
                let records = matcher.find(name, record_type).await?;
                self.pick(slot, operation, zone, records, interactive, now).await
            }

            Operation::Update { ref name, .. } => {
                let records = matcher.find(name, None).await?;
                self.pick(slot, operation, zone, records, interactive, now).await
            }

            Operation::ToggleProxy { ref name } => {
                let fqdn = matcher.qualify(name);
                let records: Vec<DnsRecord> = matcher
                    .find(name, None)
                    .await?
                    .into_iter()
                    .filter(|r| r.record_type.is_proxiable())
                    .collect();
                if records.is_empty() {
                    return Err(Reply::Failed(ProviderError::not_found(format!(
                        "no proxiable record named {fqdn}"
                    ))));
                }
                self.pick(slot, operation, zone, records, interactive, now).await
            }

            Operation::ListZones | Operation::SwitchZone { .. } => Reply::NoZoneSelected,
        };

        Ok(reply)
    }

    /// Continue with the single match, or ask the user to choose
    async fn pick(
        &self,
        slot: &mut SessionGuard,
        operation: Operation,
        zone: Zone,
        records: Vec<DnsRecord>,
        interactive: bool,
        now: DateTime<Utc>,
    ) -> Reply {
        match select_one(records) {
            Ok(record) => self.target(slot, operation, zone, record, interactive, now).await,
            Err(ProviderError::AmbiguousMatch(candidates)) => {
                let command = operation.kind();
                **slot = Some(self.session(
                    FlowStep::Selecting { operation, zone, candidates: candidates.clone() },
                    interactive,
                    now,
                ));
                Reply::Choose { command, candidates }
            }
            Err(error) => Reply::Failed(error),
        }
    }

    /// One record is chosen: confirm first, or apply now
    ///
    /// Delete always confirms. Update confirms when its fields were gathered
    /// interactively. An update that changes nothing ends here; one whose
    /// content does not fit the record asks for it again if it was gathered
    /// interactively.
    async fn target(
        &self,
        slot: &mut SessionGuard,
        operation: Operation,
        zone: Zone,
        record: DnsRecord,
        interactive: bool,
        now: DateTime<Utc>,
    ) -> Reply {
        let patched =
            matches!(operation, Operation::Update { .. }).then(|| build_patch(&operation, &record));
        let confirm = match patched {
            None => matches!(operation, Operation::Delete { .. }),
            Some(Ok(patch)) if patch.is_empty() => return Reply::Unchanged(record),
            Some(Ok(_)) => interactive,
            Some(Err(error)) if interactive => {
                let session = self.session(FlowStep::Amending { operation, zone, record }, true, now);
                return self.reject(slot, session, Reply::Retry { error, field: Field::Content });
            }
            Some(Err(error)) => return Reply::Invalid(error),
        };

        if !confirm {
            return self.apply(&zone, operation, record).await;
        }

        **slot = Some(self.session(
            FlowStep::Confirming {
                operation: operation.clone(),
                zone,
                record: record.clone(),
            },
            interactive,
            now,
        ));
        Reply::Confirm { operation, record }
    }

    async fn apply(&self, zone: &Zone, operation: Operation, record: DnsRecord) -> Reply {
        let result = match &operation {
            Operation::Delete { .. } => self
                .client
                .delete_record(&zone.id, &record.id)
                .await
                .map(|()| Reply::Deleted(record.clone())),

            Operation::Update { .. } | Operation::ToggleProxy { .. } => {
                let patch = match build_patch(&operation, &record) {
                    Ok(patch) => patch,
                    Err(error) => return Reply::Invalid(error),
                };
                if patch.is_empty() {
                    return Reply::Unchanged(record);
                }
                self.client
                    .update_record(&zone.id, &record, &patch)
                    .await
                    .map(|after| Reply::Updated { before: record.clone(), after })
            }

            _ => Err(ProviderError::rejected(format!(
                "{} does not change a single record",
                operation.kind()
            ))),
        };

        match result {
            Ok(reply) => {
                info!(
                    zone = %zone.name,
                    record = %record.name,
                    record_type = %record.record_type,
                    record_id = %record.id,
                    command = %operation.kind(),
                    "Record changed"
                );
                reply
            }
            Err(error) => Reply::Failed(error),
        }
    }
}

/// Changed fields only; values equal to the record's are left out
fn build_patch(operation: &Operation, record: &DnsRecord) -> Result<RecordPatch, ParseError> {
    let mut patch = RecordPatch::new(record.record_type);

    match operation {
        Operation::ToggleProxy { .. } => patch.proxied = Some(!record.proxied),

        Operation::Update { content, ttl, proxied, .. } => {
            if let Some(raw) = content {
                let Content { content, priority } =
                    command::parse_content(record.record_type, raw, ContentMode::Update)?;
                let priority_changed = priority.is_some_and(|p| Some(p) != record.priority);
                if content != record.content || priority_changed {
                    patch.content = Some(content);
                    patch.priority = priority.or(record.priority);
                }
            }
            if let Some(ttl) = ttl
                && *ttl != record.ttl
            {
                patch.ttl = Some(*ttl);
            }
            if let Some(proxied) = proxied
                && *proxied != record.proxied
            {
                patch.proxied = Some(*proxied);
            }
        }

        _ => {}
    }

    Ok(patch)
}
