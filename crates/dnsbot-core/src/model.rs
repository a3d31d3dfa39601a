//! Domain model shared by every component
//!
//! The bot never owns an authoritative copy of a zone. These values are
//! transient query results and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of the person sending a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the channel a message arrived on (one chat, one console)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub i64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported DNS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    Mx,
    Ns,
    Srv,
    Caa,
    Ptr,
}

impl RecordType {
    /// Every supported type, in display order
    pub const ALL: [RecordType; 9] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Txt,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Srv,
        RecordType::Caa,
        RecordType::Ptr,
    ];

    /// Wire/display spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Ptr => "PTR",
        }
    }

    /// Only address and alias records can sit behind the provider's proxy
    pub fn is_proxiable(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa | RecordType::Cname)
    }

    /// Types whose priority travels outside the content string
    pub fn has_priority(&self) -> bool {
        matches!(self, RecordType::Mx | RecordType::Srv)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

/// Record time-to-live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ttl {
    /// Let the provider choose
    #[default]
    Auto,
    /// Explicit seconds
    Seconds(u32),
}

impl Ttl {
    /// Shortest explicit TTL accepted
    pub const MIN_SECONDS: u32 = 60;
    /// Longest explicit TTL accepted
    pub const MAX_SECONDS: u32 = 86_400;
    /// Wire sentinel for [`Ttl::Auto`]
    pub const AUTO_SENTINEL: u32 = 1;

    /// Map a provider wire value to a TTL
    pub fn from_wire(value: u32) -> Self {
        if value == Self::AUTO_SENTINEL {
            Ttl::Auto
        } else {
            Ttl::Seconds(value)
        }
    }

    /// Map a TTL to the provider wire value
    pub fn to_wire(self) -> u32 {
        match self {
            Ttl::Auto => Self::AUTO_SENTINEL,
            Ttl::Seconds(secs) => secs,
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Auto => f.write_str("auto"),
            Ttl::Seconds(secs) => write!(f, "{secs}s"),
        }
    }
}

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-assigned opaque id
    pub id: String,
    /// Fully-qualified name
    pub name: String,
    pub record_type: RecordType,
    /// Content without the priority for MX/SRV
    pub content: String,
    pub ttl: Ttl,
    /// Only meaningful for proxiable types
    pub proxied: bool,
    /// MX/SRV only
    pub priority: Option<u16>,
    pub created_on: Option<DateTime<Utc>>,
    pub modified_on: Option<DateTime<Utc>>,
}

/// A provider-managed zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    /// Domain name of the zone apex
    pub name: String,
    /// Provider status string (e.g. "active"), if reported
    pub status: Option<String>,
}

/// Payload of a create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    /// Fully-qualified name
    pub name: String,
    pub record_type: RecordType,
    pub content: String,
    pub ttl: Ttl,
    pub proxied: bool,
    pub priority: Option<u16>,
}

impl RecordSpec {
    /// Whether an existing record already satisfies this spec
    pub fn matches(&self, record: &DnsRecord) -> bool {
        record.name.eq_ignore_ascii_case(&self.name)
            && record.record_type == self.record_type
            && record.content == self.content
    }
}

/// Changed fields of an update call
///
/// `record_type` is the target's (unchanged) type. Providers that need
/// structured payloads for SRV/CAA build them from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPatch {
    pub record_type: RecordType,
    pub content: Option<String>,
    pub ttl: Option<Ttl>,
    pub proxied: Option<bool>,
    pub priority: Option<u16>,
}

impl RecordPatch {
    /// An empty patch for a record of the given type
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            content: None,
            ttl: None,
            proxied: None,
            priority: None,
        }
    }

    /// True when the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.ttl.is_none()
            && self.proxied.is_none()
            && self.priority.is_none()
    }
}

/// Server-side list filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Exact fully-qualified name
    pub name: Option<String>,
    pub record_type: Option<RecordType>,
}

impl RecordFilter {
    /// Filter on name and optional type
    pub fn by_name(name: impl Into<String>, record_type: Option<RecordType>) -> Self {
        Self {
            name: Some(name.into()),
            record_type,
        }
    }

    /// Filter on type only
    pub fn by_type(record_type: Option<RecordType>) -> Self {
        Self {
            name: None,
            record_type,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of pages the provider reports (at least 1)
    pub total_pages: u32,
}

/// Shape of one `/export` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub priority: Option<u16>,
}

impl From<&DnsRecord> for ExportEntry {
    fn from(record: &DnsRecord) -> Self {
        Self {
            name: record.name.clone(),
            record_type: record.record_type,
            content: record.content.clone(),
            ttl: record.ttl.to_wire(),
            proxied: record.proxied,
            priority: record.priority,
        }
    }
}

/// Serialize records as the pretty-printed `/export` JSON array
pub fn export_json(records: &[DnsRecord]) -> crate::Result<String> {
    let entries: Vec<ExportEntry> = records.iter().map(ExportEntry::from).collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
