//! Raw and normalized patent records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::keywords::fold;

/// Sentinel value for a taxonomy dimension with no matching rule.
pub const UNCLASSIFIED: &str = "unclassified";

/// Identifier keys accepted from scraped input, in lookup order.
const IDENTIFIER_KEYS: &[&str] = &["identifier", "patent_number", "id"];

/// A record as produced by the scraping layer.
///
/// Deserialization is lenient: unknown fields are ignored, scalar values
/// where a list is expected become one-element lists, and `"nan"`/`"null"`
/// placeholders count as absent. A non-object JSON value yields an empty
/// record, which the normalizer drops for lack of an identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawRecord {
    pub identifier: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub claims: Option<String>,
    pub description: Option<String>,
    pub assignees: Vec<String>,
    pub inventors: Vec<String>,
    pub jurisdiction: Option<String>,
    pub filing_date: Option<String>,
    pub publication_date: Option<String>,
    pub legal_status: Option<String>,
}

impl RawRecord {
    /// Build a raw record from an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            identifier: first_text(obj, IDENTIFIER_KEYS),
            title: first_text(obj, &["title"]),
            abstract_text: first_text(obj, &["abstract", "abstract_text"]),
            claims: first_text(obj, &["claims"]),
            description: first_text(obj, &["description", "raw_text"]),
            assignees: first_list(obj, &["assignees", "assignee"]),
            inventors: first_list(obj, &["inventors", "inventor"]),
            jurisdiction: first_text(obj, &["jurisdiction", "country"]),
            filing_date: first_text(obj, &["filing_date"]),
            publication_date: first_text(obj, &["publication_date"]),
            legal_status: first_text(obj, &["legal_status", "status"]),
        }
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(*k).and_then(scalar_text))
}

fn first_list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).map(text_list))
        .unwrap_or_default()
}

fn scalar_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(s)
    }
}

fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// Named text blobs carried by a record, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Abstract,
    Claims,
    Description,
}

/// Structured attributes of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordMetadata {
    pub assignees: Vec<String>,
    pub inventors: Vec<String>,
    /// Upper-case jurisdiction code (e.g. `US`, `WO`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_status: Option<String>,
}

/// A normalized record. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    identifier: String,
    source_index: usize,
    text_fields: BTreeMap<TextField, String>,
    metadata: RecordMetadata,
    #[serde(skip)]
    folded_text: String,
    #[serde(skip)]
    folded_assignees: String,
}

impl Record {
    /// Build a record; folded matching views are derived here once.
    pub fn new(
        identifier: impl Into<String>,
        source_index: usize,
        text_fields: BTreeMap<TextField, String>,
        metadata: RecordMetadata,
    ) -> Self {
        let joined = text_fields.values().map(String::as_str).collect::<Vec<_>>();
        let folded_text = fold(&joined.join(" "));
        let folded_assignees = fold(&metadata.assignees.join(" ; "));
        Self {
            identifier: identifier.into(),
            source_index,
            text_fields,
            metadata,
            folded_text,
            folded_assignees,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Position of this record in the raw input batch.
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn text_fields(&self) -> &BTreeMap<TextField, String> {
        &self.text_fields
    }

    pub fn text(&self, field: TextField) -> Option<&str> {
        self.text_fields.get(&field).map(String::as_str)
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    /// Lower-cased concatenation of all text fields.
    pub fn folded_text(&self) -> &str {
        &self.folded_text
    }

    /// Lower-cased concatenation of assignee names.
    pub fn folded_assignees(&self) -> &str {
        &self.folded_assignees
    }

    /// Lower-cased jurisdiction code, empty if unknown.
    pub fn folded_jurisdiction(&self) -> String {
        self.metadata
            .jurisdiction
            .as_deref()
            .map(fold)
            .unwrap_or_default()
    }

    pub fn has_text(&self) -> bool {
        !self.folded_text.is_empty()
    }
}

/// Independent classification axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TherapeuticArea,
    MoleculeType,
    DevelopmentStage,
    Jurisdiction,
    InstitutionType,
}

impl Dimension {
    pub fn all() -> &'static [Dimension] {
        &[
            Self::TherapeuticArea,
            Self::MoleculeType,
            Self::DevelopmentStage,
            Self::Jurisdiction,
            Self::InstitutionType,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TherapeuticArea => "therapeutic_area",
            Self::MoleculeType => "molecule_type",
            Self::DevelopmentStage => "development_stage",
            Self::Jurisdiction => "jurisdiction",
            Self::InstitutionType => "institution_type",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
