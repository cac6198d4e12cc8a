//! Multi-dimensional taxonomy assignment.
//!
//! Rules within a dimension are tried in configured order and the first one
//! with a keyword hit wins. Dimensions never look at each other.

use std::borrow::Cow;
use std::collections::BTreeMap;

use patentsift_core::{Dimension, DimensionRules, MatchSource, Record, UNCLASSIFIED};
use serde::Serialize;
use tracing::debug;

/// The value assigned on one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionValue {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<usize>,
    /// Lower-priority rule values that also matched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub also_matched: Vec<String>,
}

impl DimensionValue {
    fn unclassified() -> Self {
        Self {
            value: UNCLASSIFIED.to_string(),
            matched_keyword: None,
            rule_index: None,
            also_matched: Vec::new(),
        }
    }

    pub fn is_classified(&self) -> bool {
        self.rule_index.is_some()
    }
}

/// Exactly one value per [`Dimension`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TaxonomyAssignment {
    values: BTreeMap<Dimension, DimensionValue>,
}

impl TaxonomyAssignment {
    pub fn get(&self, dimension: Dimension) -> &DimensionValue {
        // Construction fills every dimension.
        &self.values[&dimension]
    }

    pub fn value(&self, dimension: Dimension) -> &str {
        &self.get(dimension).value
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimensionValue)> {
        self.values.iter().map(|(d, v)| (*d, v))
    }
}

/// Classify a record on every dimension.
///
/// A dimension missing from `dimension_rules` is `unclassified`; validated
/// configurations always carry all of them.
pub fn classify(
    record: &Record,
    dimension_rules: &BTreeMap<Dimension, DimensionRules>,
) -> TaxonomyAssignment {
    let values = Dimension::all()
        .iter()
        .map(|&dimension| {
            let value = dimension_rules
                .get(&dimension)
                .map(|rules| classify_dimension(record, rules))
                .unwrap_or_else(DimensionValue::unclassified);
            (dimension, value)
        })
        .collect();
    TaxonomyAssignment { values }
}

fn classify_dimension(record: &Record, dim: &DimensionRules) -> DimensionValue {
    let view = match_view(record, dim.source);
    let mut assigned: Option<DimensionValue> = None;

    for (index, rule) in dim.rules.iter().enumerate() {
        let Some(keyword) = rule.keywords.first_match(&view) else {
            continue;
        };
        if let Some(winner) = assigned.as_mut() {
            if winner.value != rule.value && !winner.also_matched.contains(&rule.value) {
                winner.also_matched.push(rule.value.clone());
            }
            continue;
        }
        assigned = Some(DimensionValue {
            value: rule.value.clone(),
            matched_keyword: Some(keyword.to_string()),
            rule_index: Some(index),
            also_matched: Vec::new(),
        });
    }

    match assigned {
        Some(value) => {
            if !value.also_matched.is_empty() {
                debug!(
                    "{}: {} resolved by rule order over {:?}",
                    record.identifier(),
                    value.value,
                    value.also_matched
                );
            }
            value
        }
        None => DimensionValue::unclassified(),
    }
}

fn match_view(record: &Record, source: MatchSource) -> Cow<'_, str> {
    match source {
        MatchSource::Text => Cow::Borrowed(record.folded_text()),
        MatchSource::Assignees => Cow::Borrowed(record.folded_assignees()),
        MatchSource::Jurisdiction => Cow::Owned(record.folded_jurisdiction()),
    }
}
