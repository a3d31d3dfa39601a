//! Command resolver
//!
//! Turns one line of user text into a [`Command`]. Pure: no I/O, no state,
//! only the input and the static grammar table below.
//!
//! ```text
//! /list [type]
//! /add <name> <type> <content> [ttl|auto] [proxied]
//! /update <name> <content> [ttl|auto] [proxied]
//! /delete <name> [type]
//! /search <query>
//! /info <name>
//! /toggle_proxy <name>
//! /zones
//! /zone <zone id or domain>
//! /export [type]
//! ```
//!
//! Missing required arguments are not an error: the resolver returns
//! [`Command::Pending`] listing what is missing, and the flow engine asks
//! for it one field at a time.

pub mod normalize;
pub mod tokenize;

pub use normalize::{
    Content, ContentMode, parse_bool, parse_confirmation, parse_content, parse_name,
    parse_record_type, parse_ttl,
};
pub use tokenize::{tokenize, unquote};

use crate::error::ParseError;
use crate::model::{RecordType, Ttl};
use std::fmt;

/// Record-level commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    List,
    Add,
    Update,
    Delete,
    Search,
    Info,
    ToggleProxy,
    Zones,
    Zone,
    Export,
}

/// A value the user has to supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    RecordType,
    Content,
    Query,
    Zone,
}

impl Field {
    /// Human label used when prompting
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "record name",
            Field::RecordType => "record type",
            Field::Content => "content",
            Field::Query => "search text",
            Field::Zone => "zone id or domain",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trailing arguments that may be left out
#[derive(Debug, Clone, Copy)]
enum Optional {
    TypeFilter,
    Ttl,
    Proxied,
}

#[derive(Debug, Clone, Copy)]
enum Keyword {
    Run(CommandKind),
    Help,
    Cancel,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("list", Keyword::Run(CommandKind::List)),
    ("add", Keyword::Run(CommandKind::Add)),
    ("update", Keyword::Run(CommandKind::Update)),
    ("delete", Keyword::Run(CommandKind::Delete)),
    ("search", Keyword::Run(CommandKind::Search)),
    ("info", Keyword::Run(CommandKind::Info)),
    ("toggle_proxy", Keyword::Run(CommandKind::ToggleProxy)),
    ("zones", Keyword::Run(CommandKind::Zones)),
    ("zone", Keyword::Run(CommandKind::Zone)),
    ("export", Keyword::Run(CommandKind::Export)),
    ("help", Keyword::Help),
    ("start", Keyword::Help),
    ("cancel", Keyword::Cancel),
];

impl CommandKind {
    /// Every record-level command, in help order
    pub const ALL: [CommandKind; 10] = [
        CommandKind::List,
        CommandKind::Add,
        CommandKind::Update,
        CommandKind::Delete,
        CommandKind::Search,
        CommandKind::Info,
        CommandKind::ToggleProxy,
        CommandKind::Zones,
        CommandKind::Zone,
        CommandKind::Export,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            CommandKind::List => "list",
            CommandKind::Add => "add",
            CommandKind::Update => "update",
            CommandKind::Delete => "delete",
            CommandKind::Search => "search",
            CommandKind::Info => "info",
            CommandKind::ToggleProxy => "toggle_proxy",
            CommandKind::Zones => "zones",
            CommandKind::Zone => "zone",
            CommandKind::Export => "export",
        }
    }

    /// One-line grammar for help output
    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::List => "/list [type]",
            CommandKind::Add => "/add <name> <type> <content> [ttl|auto] [proxied]",
            CommandKind::Update => "/update <name> <content> [ttl|auto] [proxied]",
            CommandKind::Delete => "/delete <name> [type]",
            CommandKind::Search => "/search <query>",
            CommandKind::Info => "/info <name>",
            CommandKind::ToggleProxy => "/toggle_proxy <name>",
            CommandKind::Zones => "/zones",
            CommandKind::Zone => "/zone <zone id or domain>",
            CommandKind::Export => "/export [type]",
        }
    }

    /// Required positional fields, in grammar order
    pub fn required_fields(&self) -> &'static [Field] {
        match self {
            CommandKind::Add => &[Field::Name, Field::RecordType, Field::Content],
            CommandKind::Update => &[Field::Name, Field::Content],
            CommandKind::Delete | CommandKind::Info | CommandKind::ToggleProxy => &[Field::Name],
            CommandKind::Search => &[Field::Query],
            CommandKind::Zone => &[Field::Zone],
            CommandKind::List | CommandKind::Zones | CommandKind::Export => &[],
        }
    }

    fn optional_fields(&self) -> &'static [Optional] {
        match self {
            CommandKind::List | CommandKind::Delete | CommandKind::Export => &[Optional::TypeFilter],
            CommandKind::Add | CommandKind::Update => &[Optional::Ttl, Optional::Proxied],
            _ => &[],
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.keyword())
    }
}

fn lookup_keyword(token: &str) -> Option<Keyword> {
    let word = token.strip_prefix('/').unwrap_or(token);
    let word = word.split('@').next().unwrap_or(word);
    KEYWORDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .map(|(_, keyword)| *keyword)
}

/// A complete operation, every required field bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List {
        record_type: Option<RecordType>,
    },
    Add {
        name: String,
        record_type: RecordType,
        content: String,
        ttl: Ttl,
        proxied: bool,
        priority: Option<u16>,
    },
    /// Content stays raw until the target record's type is known
    Update {
        name: String,
        content: Option<String>,
        ttl: Option<Ttl>,
        proxied: Option<bool>,
    },
    Delete {
        name: String,
        record_type: Option<RecordType>,
    },
    Search {
        query: String,
    },
    Info {
        name: String,
    },
    ToggleProxy {
        name: String,
    },
    ListZones,
    SwitchZone {
        zone: String,
    },
    Export {
        record_type: Option<RecordType>,
    },
}

impl Operation {
    pub fn kind(&self) -> CommandKind {
        match self {
            Operation::List { .. } => CommandKind::List,
            Operation::Add { .. } => CommandKind::Add,
            Operation::Update { .. } => CommandKind::Update,
            Operation::Delete { .. } => CommandKind::Delete,
            Operation::Search { .. } => CommandKind::Search,
            Operation::Info { .. } => CommandKind::Info,
            Operation::ToggleProxy { .. } => CommandKind::ToggleProxy,
            Operation::ListZones => CommandKind::Zones,
            Operation::SwitchZone { .. } => CommandKind::Zone,
            Operation::Export { .. } => CommandKind::Export,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Bindings {
    name: Option<String>,
    record_type: Option<RecordType>,
    content: Option<String>,
    priority: Option<u16>,
    ttl: Option<Ttl>,
    proxied: Option<bool>,
    query: Option<String>,
    zone: Option<String>,
}

/// An operation with required fields still missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    kind: CommandKind,
    missing: Vec<Field>,
    bindings: Bindings,
}

impl PendingOperation {
    /// Start an operation with nothing bound
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            missing: kind.required_fields().to_vec(),
            bindings: Bindings::default(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Fields that were missing when the command was resolved, in grammar order
    pub fn missing(&self) -> &[Field] {
        &self.missing
    }

    /// Next field the user still has to supply
    pub fn next_field(&self) -> Option<Field> {
        self.kind
            .required_fields()
            .iter()
            .copied()
            .find(|field| !self.is_bound(*field))
    }

    fn is_bound(&self, field: Field) -> bool {
        let b = &self.bindings;
        match field {
            Field::Name => b.name.is_some(),
            Field::RecordType => b.record_type.is_some(),
            Field::Content => b.content.is_some(),
            Field::Query => b.query.is_some(),
            Field::Zone => b.zone.is_some(),
        }
    }

    /// Validate and bind one field; nothing changes on error
    pub fn bind(&mut self, field: Field, raw: &str) -> Result<(), ParseError> {
        match field {
            Field::Name => self.bindings.name = Some(parse_name(raw)?),
            Field::RecordType => self.bindings.record_type = Some(parse_record_type(raw)?),
            Field::Content => match (self.kind, self.bindings.record_type) {
                (CommandKind::Add, Some(record_type)) => {
                    let Content { content, priority } =
                        parse_content(record_type, raw, ContentMode::Create)?;
                    self.bindings.content = Some(content);
                    self.bindings.priority = priority;
                }
                _ => self.bindings.content = Some(raw.trim().to_string()),
            },
            Field::Query => self.bindings.query = Some(raw.trim().to_string()),
            Field::Zone => self.bindings.zone = Some(raw.trim().to_string()),
        }
        Ok(())
    }

    fn bind_optional(&mut self, optional: Optional, raw: &str) -> Result<(), ParseError> {
        match optional {
            Optional::TypeFilter => self.bindings.record_type = Some(parse_record_type(raw)?),
            Optional::Ttl => self.bindings.ttl = Some(parse_ttl(raw)?),
            Optional::Proxied => self.bindings.proxied = Some(parse_bool(raw)?),
        }
        Ok(())
    }

    /// Finish the operation, or hand it back with the next field to ask for
    pub fn into_operation(self) -> Result<Operation, (PendingOperation, Field)> {
        if let Some(field) = self.next_field() {
            return Err((self, field));
        }

        let b = self.bindings;
        let name = b.name.unwrap_or_default();
        let operation = match self.kind {
            CommandKind::List => Operation::List { record_type: b.record_type },
            CommandKind::Add => Operation::Add {
                name,
                record_type: b.record_type.unwrap_or(RecordType::A),
                content: b.content.unwrap_or_default(),
                ttl: b.ttl.unwrap_or_default(),
                proxied: b.proxied.unwrap_or(false),
                priority: b.priority,
            },
            CommandKind::Update => Operation::Update {
                name,
                content: b.content,
                ttl: b.ttl,
                proxied: b.proxied,
            },
            CommandKind::Delete => Operation::Delete { name, record_type: b.record_type },
            CommandKind::Search => Operation::Search { query: b.query.unwrap_or_default() },
            CommandKind::Info => Operation::Info { name },
            CommandKind::ToggleProxy => Operation::ToggleProxy { name },
            CommandKind::Zones => Operation::ListZones,
            CommandKind::Zone => Operation::SwitchZone { zone: b.zone.unwrap_or_default() },
            CommandKind::Export => Operation::Export { record_type: b.record_type },
        };
        Ok(operation)
    }
}

/// Outcome of resolving one line of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Everything required is present
    Run(Operation),
    /// Required fields are missing
    Pending(PendingOperation),
    /// Explicit cancellation of the active flow
    Cancel,
    /// Usage guide
    Help,
}

/// Resolve one line of user text
///
/// Tokens present are validated even when the operation is incomplete, so
/// `/add sub SOA` fails with `InvalidType` rather than prompting for content.
/// Tokens beyond the grammar are ignored.
pub fn resolve(raw: &str) -> Result<Command, ParseError> {
    let tokens = tokenize(raw);
    let Some((head, args)) = tokens.split_first() else {
        return Err(ParseError::UnknownCommand(String::new()));
    };

    let kind = match lookup_keyword(head) {
        Some(Keyword::Run(kind)) => kind,
        Some(Keyword::Help) => return Ok(Command::Help),
        Some(Keyword::Cancel) => return Ok(Command::Cancel),
        None => return Err(ParseError::UnknownCommand(head.clone())),
    };

    let required = kind.required_fields();
    let mut pending = PendingOperation::new(kind);
    for (field, token) in required.iter().zip(args) {
        pending.bind(*field, token)?;
    }
    pending.missing = required.iter().skip(args.len()).copied().collect();

    for (optional, token) in kind.optional_fields().iter().zip(args.iter().skip(required.len())) {
        pending.bind_optional(*optional, token)?;
    }

    Ok(match pending.into_operation() {
        Ok(operation) => Command::Run(operation),
        Err((pending, _)) => Command::Pending(pending),
    })
}
