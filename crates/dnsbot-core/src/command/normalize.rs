//! Field normalizers
//!
//! Each normalizer turns one user token into a typed value or a specific
//! [`ParseError`]. Literal spellings live in tables, not at call sites.

use crate::error::ParseError;
use crate::model::{RecordType, Ttl};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Accepted spellings for boolean arguments
const BOOLEAN_WORDS: &[(&str, bool)] = &[
    ("true", true),
    ("yes", true),
    ("false", false),
    ("no", false),
];

/// Accepted spellings for confirmation replies
const CONFIRM_WORDS: &[(&str, bool)] = &[
    ("true", true),
    ("yes", true),
    ("y", true),
    ("false", false),
    ("no", false),
    ("n", false),
];

/// Literal accepted in place of a TTL number
const TTL_AUTO: &str = "auto";

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;
const DEFAULT_MX_PRIORITY: u16 = 10;
const CAA_TAGS: &[&str] = &["issue", "issuewild", "iodef"];

fn lookup(table: &[(&str, bool)], token: &str) -> Option<bool> {
    table
        .iter()
        .find(|(word, _)| word.eq_ignore_ascii_case(token.trim()))
        .map(|(_, value)| *value)
}

/// Parse a `proxied` argument
pub fn parse_bool(token: &str) -> Result<bool, ParseError> {
    lookup(BOOLEAN_WORDS, token).ok_or_else(|| ParseError::InvalidBoolean(token.to_string()))
}

/// Parse a reply to a confirmation prompt; `None` when it is neither
pub fn parse_confirmation(token: &str) -> Option<bool> {
    lookup(CONFIRM_WORDS, token)
}

/// Parse a TTL argument
pub fn parse_ttl(token: &str) -> Result<Ttl, ParseError> {
    let token = token.trim();
    if token.eq_ignore_ascii_case(TTL_AUTO) {
        return Ok(Ttl::Auto);
    }

    let secs: u32 = token
        .parse()
        .map_err(|_| ParseError::InvalidTtl(token.to_string()))?;

    match secs {
        Ttl::AUTO_SENTINEL => Ok(Ttl::Auto),
        Ttl::MIN_SECONDS..=Ttl::MAX_SECONDS => Ok(Ttl::Seconds(secs)),
        _ => Err(ParseError::InvalidTtl(token.to_string())),
    }
}

/// Parse a record type argument
pub fn parse_record_type(token: &str) -> Result<RecordType, ParseError> {
    token
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidType(token.to_string()))
}

/// Parse a record name: short label, `@`, or fully-qualified
///
/// The result is lower-cased without a trailing dot. Qualification against
/// the zone happens in the matcher.
pub fn parse_name(token: &str) -> Result<String, ParseError> {
    let name = token.trim().trim_end_matches('.').to_ascii_lowercase();
    if name == "@" {
        return Ok(name);
    }

    check_domain(&name, true).map_err(|reason| {
        ParseError::InvalidName(format!("{}: {}", token.trim(), reason))
    })?;
    Ok(name)
}

fn check_domain(name: &str, allow_wildcard: bool) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty".into());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("{} chars (max {MAX_NAME_LEN})", name.len()));
    }

    for (idx, label) in name.split('.').enumerate() {
        if idx == 0 && allow_wildcard && label == "*" {
            continue;
        }
        if label.is_empty() {
            return Err("empty label".into());
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(format!("label '{label}' longer than {MAX_LABEL_LEN}"));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("label '{label}' has invalid characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!("label '{label}' starts or ends with a hyphen"));
        }
    }
    Ok(())
}

/// Record content split into the content string and an optional priority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub content: String,
    pub priority: Option<u16>,
}

impl Content {
    fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            priority: None,
        }
    }
}

/// Whether content is for a new record or replaces existing content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    Create,
    Update,
}

/// Check content against the shape its record type requires
///
/// MX accepts `[priority] host`. SRV accepts `priority weight port target`,
/// and on update also `weight port target` (priority kept). CAA accepts
/// `flags tag value` and is normalized to the provider's quoted form.
pub fn parse_content(
    record_type: RecordType,
    raw: &str,
    mode: ContentMode,
) -> Result<Content, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::content(record_type, "content is empty"));
    }

    match record_type {
        RecordType::A => raw
            .parse::<Ipv4Addr>()
            .map(|ip| Content::plain(ip.to_string()))
            .map_err(|_| ParseError::content(record_type, format!("'{raw}' is not an IPv4 address"))),
        RecordType::Aaaa => raw
            .parse::<Ipv6Addr>()
            .map(|ip| Content::plain(ip.to_string()))
            .map_err(|_| ParseError::content(record_type, format!("'{raw}' is not an IPv6 address"))),
        RecordType::Cname | RecordType::Ns | RecordType::Ptr => {
            hostname(record_type, raw).map(Content::plain)
        }
        RecordType::Txt => Ok(Content::plain(raw)),
        RecordType::Mx => parse_mx(raw, mode),
        RecordType::Srv => parse_srv(raw, mode),
        RecordType::Caa => parse_caa(raw),
    }
}

fn hostname(record_type: RecordType, raw: &str) -> Result<String, ParseError> {
    let host = raw.trim_end_matches('.');
    check_domain(host, false)
        .map_err(|reason| ParseError::content(record_type, format!("'{raw}' is not a hostname: {reason}")))?;
    Ok(host.to_string())
}

fn priority(record_type: RecordType, token: &str) -> Result<u16, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::content(record_type, format!("'{token}' is not a priority (0-65535)")))
}

fn parse_mx(raw: &str, mode: ContentMode) -> Result<Content, ParseError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [host] => Ok(Content {
            content: hostname(RecordType::Mx, host)?,
            priority: (mode == ContentMode::Create).then_some(DEFAULT_MX_PRIORITY),
        }),
        [prio, host] => Ok(Content {
            content: hostname(RecordType::Mx, host)?,
            priority: Some(priority(RecordType::Mx, prio)?),
        }),
        _ => Err(ParseError::content(RecordType::Mx, "expected '[priority] host'")),
    }
}

fn parse_srv(raw: &str, mode: ContentMode) -> Result<Content, ParseError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    let (prio, rest) = match (parts.as_slice(), mode) {
        ([prio, rest @ ..], _) if rest.len() == 3 => (Some(priority(RecordType::Srv, prio)?), rest),
        (rest, ContentMode::Update) if rest.len() == 3 => (None, rest),
        _ => {
            return Err(ParseError::content(
                RecordType::Srv,
                "expected 'priority weight port target'",
            ));
        }
    };

    let [weight, port, target] = rest else {
        return Err(ParseError::content(RecordType::Srv, "expected 'weight port target'"));
    };
    let weight: u16 = weight
        .parse()
        .map_err(|_| ParseError::content(RecordType::Srv, format!("'{weight}' is not a weight")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| ParseError::content(RecordType::Srv, format!("'{port}' is not a port")))?;
    let target = hostname(RecordType::Srv, target)?;

    Ok(Content {
        content: format!("{weight} {port} {target}"),
        priority: prio,
    })
}

fn parse_caa(raw: &str) -> Result<Content, ParseError> {
    let mut parts = raw.splitn(3, char::is_whitespace);
    let (Some(flags), Some(tag), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::content(RecordType::Caa, "expected 'flags tag value'"));
    };

    let flags: u8 = flags
        .parse()
        .map_err(|_| ParseError::content(RecordType::Caa, format!("'{flags}' is not a flag byte")))?;
    let tag = tag.to_ascii_lowercase();
    if !CAA_TAGS.contains(&tag.as_str()) {
        return Err(ParseError::content(
            RecordType::Caa,
            format!("tag must be one of {}", CAA_TAGS.join(", ")),
        ));
    }
    let value = value.trim().trim_matches('"');
    if value.is_empty() {
        return Err(ParseError::content(RecordType::Caa, "value is empty"));
    }

    Ok(Content::plain(format!("{flags} {tag} \"{value}\"")))
}
