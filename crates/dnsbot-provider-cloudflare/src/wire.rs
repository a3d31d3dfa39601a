//! Cloudflare API v4 wire format
//!
//! Response envelopes and record bodies, plus the conversions to and from
//! the core model. Unknown fields are ignored; missing required fields fail
//! decoding and surface as `MalformedResponse`.

use chrono::{DateTime, Utc};
use dnsbot_core::{DnsRecord, RecordPatch, RecordSpec, RecordType, Ttl, Zone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Envelope around every API response
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CloudflareMessage>,
    pub result_info: Option<ResultInfo>,
}

impl<T> CloudflareResponse<T> {
    /// Total pages, at least 1
    pub fn total_pages(&self) -> u32 {
        self.result_info
            .as_ref()
            .and_then(|info| info.total_pages)
            .unwrap_or(1)
            .max(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudflareMessage {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Zone as returned by `GET /zones`
#[derive(Debug, Deserialize)]
pub struct WireZone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<WireZone> for Zone {
    fn from(zone: WireZone) -> Self {
        Zone {
            id: zone.id,
            name: zone.name,
            status: zone.status,
        }
    }
}

/// DNS record as returned by the `dns_records` endpoints
#[derive(Debug, Deserialize)]
pub struct WireRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub priority: Option<u16>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
}

impl WireRecord {
    /// Convert to the core model
    ///
    /// Returns `None` for record types the bot does not manage.
    pub fn into_record(self) -> Option<DnsRecord> {
        let record_type: RecordType = self.record_type.parse().ok()?;

        let (content, priority) = match record_type {
            RecordType::Srv => match self.data.as_ref().and_then(|d| SrvData::deserialize(d).ok()) {
                Some(srv) => (
                    format!("{} {} {}", srv.weight, srv.port, trim_dot(&srv.target)),
                    Some(srv.priority),
                ),
                None => (self.content, self.priority),
            },
            RecordType::Caa => match self.data.as_ref().and_then(|d| CaaData::deserialize(d).ok()) {
                Some(caa) => (
                    format!("{} {} \"{}\"", caa.flags, caa.tag.to_ascii_lowercase(), caa.value),
                    None,
                ),
                None => (self.content, None),
            },
            RecordType::Mx => (trim_dot(&self.content).to_string(), self.priority),
            RecordType::Cname | RecordType::Ns | RecordType::Ptr => {
                (trim_dot(&self.content).to_string(), None)
            }
            RecordType::A | RecordType::Aaaa | RecordType::Txt => (self.content, None),
        };

        Some(DnsRecord {
            id: self.id,
            name: trim_dot(&self.name).to_ascii_lowercase(),
            record_type,
            content,
            ttl: Ttl::from_wire(self.ttl),
            proxied: self.proxied.unwrap_or(false),
            priority,
            created_on: self.created_on,
            modified_on: self.modified_on,
        })
    }
}

/// Structured `data` of an SRV record
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

impl SrvData {
    /// Build from `weight port target` content plus the separate priority
    pub fn from_content(content: &str, priority: Option<u16>) -> Result<Self, PayloadError> {
        let priority = priority.ok_or(PayloadError::MissingPriority(RecordType::Srv))?;
        let parts: Vec<&str> = content.split_whitespace().collect();
        let [weight, port, target] = parts.as_slice() else {
            return Err(PayloadError::Shape {
                record_type: RecordType::Srv,
                content: content.to_string(),
            });
        };
        let number = |token: &str| {
            token.parse::<u16>().map_err(|_| PayloadError::Shape {
                record_type: RecordType::Srv,
                content: content.to_string(),
            })
        };

        Ok(Self {
            priority,
            weight: number(weight)?,
            port: number(port)?,
            target: (*target).to_string(),
        })
    }
}

/// Structured `data` of a CAA record
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaaData {
    pub flags: u8,
    pub tag: String,
    pub value: String,
}

impl CaaData {
    /// Build from `flags tag "value"` content
    pub fn from_content(content: &str) -> Result<Self, PayloadError> {
        let shape = || PayloadError::Shape {
            record_type: RecordType::Caa,
            content: content.to_string(),
        };
        let mut parts = content.splitn(3, ' ');
        let (Some(flags), Some(tag), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(shape());
        };

        Ok(Self {
            flags: flags.parse().map_err(|_| shape())?,
            tag: tag.to_string(),
            value: value.trim().trim_matches('"').to_string(),
        })
    }
}

/// JSON body of `POST /zones/{id}/dns_records`
pub fn create_body(spec: &RecordSpec) -> Result<Value, PayloadError> {
    let mut body = Map::new();
    body.insert("type".into(), spec.record_type.as_str().into());
    body.insert("name".into(), spec.name.clone().into());
    body.insert("ttl".into(), spec.ttl.to_wire().into());
    if spec.record_type.is_proxiable() {
        body.insert("proxied".into(), spec.proxied.into());
    }
    insert_content(&mut body, spec.record_type, &spec.content, spec.priority)?;
    Ok(Value::Object(body))
}

/// JSON body of `PATCH /zones/{id}/dns_records/{record_id}`
///
/// Only the fields present in the patch are sent.
pub fn patch_body(patch: &RecordPatch) -> Result<Value, PayloadError> {
    let mut body = Map::new();
    if let Some(ttl) = patch.ttl {
        body.insert("ttl".into(), ttl.to_wire().into());
    }
    if let Some(proxied) = patch.proxied {
        body.insert("proxied".into(), proxied.into());
    }
    match &patch.content {
        Some(content) => insert_content(&mut body, patch.record_type, content, patch.priority)?,
        None => {
            if let Some(priority) = patch.priority {
                if patch.record_type == RecordType::Srv {
                    return Err(PayloadError::PriorityWithoutContent);
                }
                body.insert("priority".into(), priority.into());
            }
        }
    }
    Ok(Value::Object(body))
}

fn insert_content(
    body: &mut Map<String, Value>,
    record_type: RecordType,
    content: &str,
    priority: Option<u16>,
) -> Result<(), PayloadError> {
    match record_type {
        RecordType::Srv => {
            let data = SrvData::from_content(content, priority)?;
            body.insert("data".into(), serde_json::to_value(data)?);
        }
        RecordType::Caa => {
            let data = CaaData::from_content(content)?;
            body.insert("data".into(), serde_json::to_value(data)?);
        }
        RecordType::Mx => {
            let priority = priority.ok_or(PayloadError::MissingPriority(RecordType::Mx))?;
            body.insert("content".into(), content.into());
            body.insert("priority".into(), priority.into());
        }
        _ => {
            body.insert("content".into(), content.into());
        }
    }
    Ok(())
}

fn trim_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}
