//! Plain-text rendering of engine replies
//!
//! The console transport prints these strings as-is. A chat transport would
//! render the same `Reply` values into its own markup.

use dnsbot_core::{CommandKind, DnsRecord, Operation, ProviderError, Reply, Zone};
use std::fmt::Write;

/// Render one reply
pub fn render(reply: &Reply) -> String {
    match reply {
        Reply::Help => help_text(),
        Reply::Prompt { command, field } => format!("{}: send the {}.", command, field),
        Reply::Retry { error, field } => {
            format!("{}\nSend the {} again, or /cancel.", capitalize(&error.to_string()), field)
        }
        Reply::Invalid(error) => format!("{}\nSend /help for usage.", capitalize(&error.to_string())),
        Reply::Records {
            zone,
            record_type,
            records,
        } => {
            let title = match record_type {
                Some(t) => format!("{} records in {}", t, zone.name),
                None => format!("Records in {}", zone.name),
            };
            record_list(&title, records)
        }
        Reply::SearchResults { query, records } => {
            record_list(&format!("Search results for '{}'", query), records)
        }
        Reply::Details { name, records } => {
            let mut out = format!("Records named {}", name);
            for record in records {
                out.push_str("\n\n");
                out.push_str(&record_details(record));
            }
            out
        }
        Reply::Created(record) => format!("Record created.\n{}", record_details(record)),
        Reply::Updated { before, after } => format!(
            "Record updated.\nbefore: {}\nafter:  {}",
            record_line(before),
            record_line(after)
        ),
        Reply::Unchanged(record) => {
            format!("Nothing to change, the record already reads:\n{}", record_line(record))
        }
        Reply::Deleted(record) => format!("Record deleted: {}", record_line(record)),
        Reply::Choose { command, candidates } => {
            let mut out = format!("{} matches {} records. Pick one:", command, candidates.len());
            for (i, record) in candidates.iter().enumerate() {
                let _ = write!(out, "\n{}. {}  [{}]", i + 1, record_line(record), record.id);
            }
            out.push_str("\nReply with a number, a record type or an id, or /cancel.");
            out
        }
        Reply::BadChoice { options } => format!(
            "That does not pick out one record. Reply with a number from 1 to {}, or an id.",
            options
        ),
        Reply::Confirm { operation, record } => format!(
            "{}\n{}\nProceed? (yes/no)",
            confirm_question(operation),
            record_line(record)
        ),
        Reply::BadConfirmation => "Please answer yes or no.".to_string(),
        Reply::Zones { zones, current } => zone_list(zones, current.as_deref()),
        Reply::ZoneSwitched(zone) => format!("Now working in zone {} ({}).", zone.name, zone.id),
        Reply::Export { zone, count, json } => {
            format!("Export of {} ({} records):\n{}", zone, count, json)
        }
        Reply::NoZoneSelected => {
            "No zone selected. Use /zones to see them and /zone <id or domain> to pick one.".to_string()
        }
        Reply::Discarded => "Cancelled, nothing was changed.".to_string(),
        Reply::NothingToCancel => "Nothing to cancel.".to_string(),
        Reply::FlowEnded(reason) => format!("{}. Start again with a command.", capitalize(&reason.to_string())),
        Reply::Failed(error) => failure(error),
        Reply::Superseded { previous, reply } => {
            format!("(Dropped the unfinished {}.)\n{}", previous, render(reply))
        }
    }
}

/// Usage guide built from the command table
pub fn help_text() -> String {
    let mut out = String::from("DNS bot commands:\n");
    for kind in CommandKind::ALL {
        let _ = writeln!(out, "  {}", kind.usage());
    }
    out.push_str("  /cancel\n\n");
    out.push_str("Leave out any required argument and the bot asks for it.\n");
    out.push_str("Names may be short (www), @ for the zone apex, or fully qualified.\n");
    out.push_str("TTL is seconds (60-86400) or auto. Proxied is true/false or yes/no.\n");
    out.push_str("Record types: A, AAAA, CNAME, TXT, MX, NS, SRV, CAA, PTR");
    out
}

fn failure(error: &ProviderError) -> String {
    match error {
        ProviderError::NotFound(what) => format!("Not found: {}.", what),
        ProviderError::RateLimited { .. } => {
            "The DNS provider is rate limiting requests. Try again in a moment.".to_string()
        }
        ProviderError::Unauthorized(message) => format!(
            "The DNS provider refused the credential. Check the API token's permissions.\n({})",
            message
        ),
        ProviderError::Transient(message) => {
            format!("The DNS provider did not respond in time. Try again.\n({})", message)
        }
        other => format!("Error: {}", other),
    }
}

fn confirm_question(operation: &Operation) -> String {
    match operation {
        Operation::Delete { .. } => "Delete this record?".to_string(),
        Operation::Update {
            content,
            ttl,
            proxied,
            ..
        } => {
            let mut changes = Vec::new();
            if let Some(content) = content {
                changes.push(format!("content {}", content));
            }
            if let Some(ttl) = ttl {
                changes.push(format!("ttl {}", ttl));
            }
            if let Some(proxied) = proxied {
                changes.push(format!("proxied {}", proxied));
            }
            format!("Update this record ({})?", changes.join(", "))
        }
        other => format!("Apply {} to this record?", other.kind()),
    }
}

fn record_list(title: &str, records: &[DnsRecord]) -> String {
    if records.is_empty() {
        return format!("{}\nNo records found.", title);
    }
    let mut out = format!("{} ({})", title, records.len());
    for record in records {
        out.push('\n');
        out.push_str(&record_line(record));
    }
    out
}

/// One-line summary of a record
pub fn record_line(record: &DnsRecord) -> String {
    let mut line = format!("{:<5} {} -> ", record.record_type.as_str(), record.name);
    if let Some(priority) = record.priority {
        let _ = write!(line, "{} ", priority);
    }
    let _ = write!(line, "{} (ttl {})", record.content, record.ttl);
    if record.proxied {
        line.push_str(" [proxied]");
    }
    line
}

fn record_details(record: &DnsRecord) -> String {
    let mut out = format!("{} {}\n", record.record_type, record.name);
    let _ = writeln!(out, "  content:  {}", record.content);
    if let Some(priority) = record.priority {
        let _ = writeln!(out, "  priority: {}", priority);
    }
    let _ = writeln!(out, "  ttl:      {}", record.ttl);
    if record.record_type.is_proxiable() {
        let _ = writeln!(out, "  proxied:  {}", if record.proxied { "yes" } else { "no" });
    }
    let _ = write!(out, "  id:       {}", record.id);
    if let Some(created) = record.created_on {
        let _ = write!(out, "\n  created:  {}", created.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(modified) = record.modified_on {
        let _ = write!(out, "\n  modified: {}", modified.format("%Y-%m-%d %H:%M UTC"));
    }
    out
}

fn zone_list(zones: &[Zone], current: Option<&str>) -> String {
    if zones.is_empty() {
        return "The credential cannot see any zones.".to_string();
    }
    let mut out = String::from("Zones:");
    for zone in zones {
        let marker = if Some(zone.id.as_str()) == current { "*" } else { " " };
        let _ = write!(out, "\n{} {}  {}", marker, zone.name, zone.id);
        if let Some(status) = &zone.status {
            let _ = write!(out, " ({})", status);
        }
    }
    out.push_str("\nSwitch with /zone <id or domain>.");
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
