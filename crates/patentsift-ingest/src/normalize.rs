//! Record normalization: raw scraped records → unique canonical records.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use patentsift_core::keywords::collapse_whitespace;
use patentsift_core::{RawRecord, Record, RecordMetadata, TextField};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

static IDENTIFIER_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-,]+").unwrap());
static JURISDICTION_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]{2})\d").unwrap());

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

/// Why a raw record did not become a normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// No usable identifier.
    MissingIdentifier,
    /// Lost a merge against a more complete record with the same identifier.
    DuplicateMerged,
}

/// A raw record excluded during normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRecord {
    pub source_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub reason: DropReason,
    /// Input index of the record that survived the merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kept_source_index: Option<usize>,
}

/// Output of the normalizer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedBatch {
    pub records: Vec<Record>,
    pub dropped: Vec<DroppedRecord>,
}

/// Duplicate group for one canonical identifier.
struct Group {
    identifier: String,
    best: usize,
    best_completeness: usize,
    members: Vec<usize>,
}

/// Canonicalizes and deduplicates raw records.
pub struct Normalizer;

impl Normalizer {
    /// Normalize a raw batch.
    ///
    /// Records sharing a canonical identifier collapse to the most complete
    /// one (first seen wins ties). Output order is the first-seen order of
    /// each identifier.
    pub fn normalize(raw_records: &[RawRecord]) -> NormalizedBatch {
        let mut groups: Vec<Group> = Vec::new();
        let mut by_identifier: HashMap<String, usize> = HashMap::new();
        let mut dropped = Vec::new();

        for (index, raw) in raw_records.iter().enumerate() {
            let Some(identifier) = raw.identifier.as_deref().and_then(canonical_identifier) else {
                warn!("Dropping raw record #{}: missing identifier", index);
                dropped.push(DroppedRecord {
                    source_index: index,
                    identifier: None,
                    reason: DropReason::MissingIdentifier,
                    kept_source_index: None,
                });
                continue;
            };

            let score = completeness(raw);
            match by_identifier.get(&identifier) {
                Some(&g) => {
                    let group = &mut groups[g];
                    group.members.push(index);
                    if score > group.best_completeness {
                        group.best = index;
                        group.best_completeness = score;
                    }
                }
                None => {
                    by_identifier.insert(identifier.clone(), groups.len());
                    groups.push(Group {
                        identifier,
                        best: index,
                        best_completeness: score,
                        members: vec![index],
                    });
                }
            }
        }

        let mut records = Vec::with_capacity(groups.len());
        for group in groups {
            for &member in &group.members {
                if member != group.best {
                    debug!(
                        "Merged duplicate {} (#{} into #{})",
                        group.identifier, member, group.best
                    );
                    dropped.push(DroppedRecord {
                        source_index: member,
                        identifier: Some(group.identifier.clone()),
                        reason: DropReason::DuplicateMerged,
                        kept_source_index: Some(group.best),
                    });
                }
            }
            records.push(build_record(group.identifier, group.best, &raw_records[group.best]));
        }
        dropped.sort_by_key(|d| d.source_index);

        info!(
            "Normalized {} raw records into {} unique ({} dropped)",
            raw_records.len(),
            records.len(),
            dropped.len()
        );

        NormalizedBatch { records, dropped }
    }
}

/// Canonical identifier: whitespace, hyphens and commas removed, upper-cased.
pub fn canonical_identifier(raw: &str) -> Option<String> {
    let id = IDENTIFIER_NOISE.replace_all(raw, "").to_uppercase();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Number of non-empty fields, text and metadata alike.
pub fn completeness(raw: &RawRecord) -> usize {
    let texts = [
        &raw.title,
        &raw.abstract_text,
        &raw.claims,
        &raw.description,
        &raw.jurisdiction,
        &raw.filing_date,
        &raw.publication_date,
        &raw.legal_status,
    ];
    let filled = texts
        .iter()
        .filter(|t| t.as_deref().is_some_and(|s| !s.trim().is_empty()))
        .count();
    filled + usize::from(!raw.assignees.is_empty()) + usize::from(!raw.inventors.is_empty())
}

/// Parse a filing/publication date; unrecognized formats yield `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(raw, fmt)
            .or_else(|_| NaiveDate::parse_from_str(head, fmt))
            .ok()
    })
}

/// Explicit two-letter jurisdiction, else the identifier's country prefix.
fn jurisdiction_of(raw: &RawRecord, identifier: &str) -> Option<String> {
    let explicit = raw
        .jurisdiction
        .as_deref()
        .map(|j| j.trim().to_uppercase())
        .filter(|j| j.len() == 2 && j.chars().all(|c| c.is_ascii_alphabetic()));
    explicit.or_else(|| {
        JURISDICTION_PREFIX
            .captures(identifier)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| collapse_whitespace(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn build_record(identifier: String, source_index: usize, raw: &RawRecord) -> Record {
    let mut text_fields = BTreeMap::new();
    let texts = [
        (TextField::Title, &raw.title),
        (TextField::Abstract, &raw.abstract_text),
        (TextField::Claims, &raw.claims),
        (TextField::Description, &raw.description),
    ];
    for (field, text) in texts {
        if let Some(text) = text {
            let text = collapse_whitespace(text);
            if !text.is_empty() {
                text_fields.insert(field, text);
            }
        }
    }

    let date = |d: &Option<String>| {
        d.as_deref().and_then(|s| {
            let parsed = parse_date(s);
            if parsed.is_none() {
                debug!("Unparseable date {:?} on {}", s, identifier);
            }
            parsed
        })
    };

    let metadata = RecordMetadata {
        assignees: clean_list(&raw.assignees),
        inventors: clean_list(&raw.inventors),
        jurisdiction: jurisdiction_of(raw, &identifier),
        filing_date: date(&raw.filing_date),
        publication_date: date(&raw.publication_date),
        legal_status: raw
            .legal_status
            .as_deref()
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty()),
    };

    Record::new(identifier, source_index, text_fields, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, title: &str) -> RawRecord {
        RawRecord {
            identifier: Some(id.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_canonical_identifier() {
        assert_eq!(canonical_identifier(" us-2020 0123,456 a1 ").as_deref(), Some("US20200123456A1"));
        assert_eq!(canonical_identifier(" - "), None);
    }

    #[test]
    fn test_missing_identifier_dropped() {
        let batch = Normalizer::normalize(&[RawRecord::default(), raw("  ", "t"), raw("US1", "t")]);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.dropped.len(), 2);
        assert!(batch
            .dropped
            .iter()
            .all(|d| d.reason == DropReason::MissingIdentifier));
    }

    #[test]
    fn test_more_complete_duplicate_wins() {
        let a = raw("US1", "CRBN ligand");
        let mut b = raw("us-1", "CRBN ligand for cancer");
        b.abstract_text = Some("Compounds binding cereblon.".into());
        let batch = Normalizer::normalize(&[a, raw("EP2", "other"), b]);

        assert_eq!(batch.records.len(), 2);
        let kept = &batch.records[0];
        assert_eq!(kept.identifier(), "US1");
        assert_eq!(kept.source_index(), 2);
        assert_eq!(kept.text(TextField::Abstract), Some("Compounds binding cereblon."));
        assert_eq!(batch.records[1].identifier(), "EP2");

        assert_eq!(batch.dropped.len(), 1);
        assert_eq!(batch.dropped[0].source_index, 0);
        assert_eq!(batch.dropped[0].reason, DropReason::DuplicateMerged);
        assert_eq!(batch.dropped[0].kept_source_index, Some(2));
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let batch = Normalizer::normalize(&[raw("US1", "first"), raw("US1", "second")]);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].text(TextField::Title), Some("first"));
    }

    #[test]
    fn test_whitespace_normalized_case_kept() {
        let batch = Normalizer::normalize(&[raw("US1", "  CRBN\n  Ligand  ")]);
        let record = &batch.records[0];
        assert_eq!(record.text(TextField::Title), Some("CRBN Ligand"));
        assert_eq!(record.folded_text(), "crbn ligand");
    }

    #[test]
    fn test_jurisdiction_derivation() {
        let mut explicit = raw("X123", "t");
        explicit.jurisdiction = Some("ep".into());
        let batch = Normalizer::normalize(&[raw("WO2021123456A1", "t"), explicit, raw("ALT_TERM_001", "t")]);
        assert_eq!(batch.records[0].metadata().jurisdiction.as_deref(), Some("WO"));
        assert_eq!(batch.records[1].metadata().jurisdiction.as_deref(), Some("EP"));
        assert_eq!(batch.records[2].metadata().jurisdiction, None);
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4);
        assert_eq!(parse_date("2021-03-04"), expected);
        assert_eq!(parse_date("20210304"), expected);
        assert_eq!(parse_date("2021/03/04"), expected);
        assert_eq!(parse_date("2021-03-04T10:00:00Z"), expected);
        assert_eq!(parse_date("March 4th"), None);
    }

    #[test]
    fn test_completeness_counts_metadata() {
        let mut r = raw("US1", "t");
        assert_eq!(completeness(&r), 1);
        r.assignees = vec!["Acme Inc".into()];
        r.filing_date = Some("2020-01-01".into());
        r.claims = Some("   ".into());
        assert_eq!(completeness(&r), 3);
    }
}
