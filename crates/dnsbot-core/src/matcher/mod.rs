//! Record matcher
//!
//! Resolves a user-typed name to concrete records in the active zone.
//! Never picks among several matches on its own: more than one match is
//! returned to the caller, which must get an explicit selection before any
//! mutation.

use crate::client::ProviderClient;
use crate::error::ProviderError;
use crate::model::{DnsRecord, RecordFilter, RecordType, Zone};

/// Turn a short label, `@`, or FQDN into a fully-qualified name in `zone_domain`
pub fn qualify(name: &str, zone_domain: &str) -> String {
    let domain = zone_domain.trim_end_matches('.').to_ascii_lowercase();
    let name = name.trim().trim_end_matches('.').to_ascii_lowercase();

    if name == "@" || name.is_empty() || name == domain {
        return domain;
    }
    if name.ends_with(&format!(".{domain}")) {
        return name;
    }
    format!("{name}.{domain}")
}

/// Exactly one record, or `AmbiguousMatch` with every candidate
pub fn select_one(mut records: Vec<DnsRecord>) -> Result<DnsRecord, ProviderError> {
    match records.len() {
        0 => Err(ProviderError::not_found("no matching record")),
        1 => Ok(records.remove(0)),
        _ => Err(ProviderError::AmbiguousMatch(records)),
    }
}

fn display_order(records: &mut [DnsRecord]) {
    records.sort_by(|a, b| {
        let rank = |t: RecordType| RecordType::ALL.iter().position(|x| *x == t);
        rank(a.record_type)
            .cmp(&rank(b.record_type))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.content.cmp(&b.content))
    });
}

/// Lookups bound to one zone, read once per command
pub struct RecordMatcher<'a> {
    client: &'a ProviderClient,
    zone: &'a Zone,
}

impl<'a> RecordMatcher<'a> {
    pub fn new(client: &'a ProviderClient, zone: &'a Zone) -> Self {
        Self { client, zone }
    }

    pub fn qualify(&self, name: &str) -> String {
        qualify(name, &self.zone.name)
    }

    /// Records named `name`, optionally of one type
    ///
    /// Filters server-side and re-checks locally. Zero matches is `NotFound`.
    pub async fn find(
        &self,
        name: &str,
        record_type: Option<RecordType>,
    ) -> Result<Vec<DnsRecord>, ProviderError> {
        let fqdn = self.qualify(name);
        let filter = RecordFilter::by_name(fqdn.clone(), record_type);

        let mut records: Vec<DnsRecord> = self
            .client
            .list_records(&self.zone.id, &filter)
            .await?
            .into_iter()
            .filter(|r| r.name.eq_ignore_ascii_case(&fqdn))
            .filter(|r| record_type.is_none_or(|t| r.record_type == t))
            .collect();

        if records.is_empty() {
            return Err(ProviderError::not_found(match record_type {
                Some(t) => format!("no {t} record named {fqdn}"),
                None => format!("no record named {fqdn}"),
            }));
        }

        display_order(&mut records);
        Ok(records)
    }

    /// Every record in the zone, optionally of one type
    pub async fn list(&self, record_type: Option<RecordType>) -> Result<Vec<DnsRecord>, ProviderError> {
        let mut records = self
            .client
            .list_records(&self.zone.id, &RecordFilter::by_type(record_type))
            .await?;
        display_order(&mut records);
        Ok(records)
    }

    /// Records whose name contains `query`, ignoring case
    pub async fn search(&self, query: &str) -> Result<Vec<DnsRecord>, ProviderError> {
        let needle = query.trim().to_ascii_lowercase();
        let mut records = self.list(None).await?;
        records.retain(|r| r.name.to_ascii_lowercase().contains(&needle));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ttl;

    #[test]
    fn short_labels_get_the_zone_suffix() {
        assert_eq!(qualify("sub", "example.com"), "sub.example.com");
        assert_eq!(qualify("a.b", "example.com"), "a.b.example.com");
        assert_eq!(qualify("*.dev", "example.com"), "*.dev.example.com");
    }

    #[test]
    fn apex_and_qualified_names_are_kept() {
        assert_eq!(qualify("@", "example.com"), "example.com");
        assert_eq!(qualify("Example.COM.", "example.com"), "example.com");
        assert_eq!(qualify("www.example.com", "example.com"), "www.example.com");
        assert_eq!(qualify("www.example.com.", "Example.com."), "www.example.com");
    }

    #[test]
    fn suffix_must_be_label_aligned() {
        assert_eq!(qualify("notexample.com", "example.com"), "notexample.com.example.com");
    }

    fn record(id: &str, record_type: RecordType) -> DnsRecord {
        DnsRecord {
            id: id.into(),
            name: "sub.example.com".into(),
            record_type,
            content: "x".into(),
            ttl: Ttl::Auto,
            proxied: false,
            priority: None,
            created_on: None,
            modified_on: None,
        }
    }

    #[test]
    fn select_one_refuses_to_guess() {
        assert!(matches!(select_one(vec![]), Err(ProviderError::NotFound(_))));
        assert_eq!(select_one(vec![record("1", RecordType::A)]).unwrap().id, "1");

        let both = vec![record("1", RecordType::A), record("2", RecordType::Cname)];
        match select_one(both.clone()) {
            Err(ProviderError::AmbiguousMatch(candidates)) => assert_eq!(candidates, both),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn candidates_sort_by_type_order() {
        let mut records = vec![
            record("3", RecordType::Txt),
            record("2", RecordType::Cname),
            record("1", RecordType::A),
        ];
        display_order(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
