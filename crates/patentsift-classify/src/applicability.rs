//! Human / animal applicability filter.
//!
//! Exclusion hits alone mean `animal`, inclusion hits alone mean `human`;
//! anything else is `unclear`. A record matching both sets is never labeled
//! `human`.

use patentsift_core::{ApplicabilityRules, Record};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicabilityLabel {
    Human,
    Animal,
    Unclear,
}

impl ApplicabilityLabel {
    pub fn all() -> &'static [ApplicabilityLabel] {
        &[Self::Human, Self::Animal, Self::Unclear]
    }
}

impl std::fmt::Display for ApplicabilityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Animal => write!(f, "animal"),
            Self::Unclear => write!(f, "unclear"),
        }
    }
}

/// Strength of the evidence behind a `human` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanEvidence {
    /// Two or more distinct inclusion keywords.
    High,
    /// Exactly one inclusion keyword.
    Likely,
}

/// Applicability label plus the keywords that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applicability {
    pub label: ApplicabilityLabel,
    /// Set only for `human` labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<HumanEvidence>,
    pub inclusion_hits: Vec<String>,
    pub exclusion_hits: Vec<String>,
}

impl Applicability {
    pub fn is_human(&self) -> bool {
        self.label == ApplicabilityLabel::Human
    }

    /// Both keyword sets fired; resolved to `unclear`.
    pub fn is_conflicted(&self) -> bool {
        !self.inclusion_hits.is_empty() && !self.exclusion_hits.is_empty()
    }

}

fn evidence_for(label: ApplicabilityLabel, inclusion_hits: usize) -> Option<HumanEvidence> {
    match (label, inclusion_hits) {
        (ApplicabilityLabel::Human, n) if n >= 2 => Some(HumanEvidence::High),
        (ApplicabilityLabel::Human, _) => Some(HumanEvidence::Likely),
        _ => None,
    }
}

/// Label a record. Total: every record gets exactly one label.
pub fn classify_applicability(record: &Record, rules: &ApplicabilityRules) -> Applicability {
    let text = record.folded_text();
    let inclusion_hits: Vec<String> = rules
        .inclusion
        .matches(text)
        .into_iter()
        .map(str::to_string)
        .collect();
    let exclusion_hits: Vec<String> = rules
        .exclusion
        .matches(text)
        .into_iter()
        .map(str::to_string)
        .collect();

    let label = match (inclusion_hits.is_empty(), exclusion_hits.is_empty()) {
        (false, true) => ApplicabilityLabel::Human,
        (true, false) => ApplicabilityLabel::Animal,
        (false, false) => {
            debug!(
                "{}: inclusion {:?} and exclusion {:?} both matched, labeled unclear",
                record.identifier(),
                inclusion_hits,
                exclusion_hits
            );
            ApplicabilityLabel::Unclear
        }
        (true, true) => ApplicabilityLabel::Unclear,
    };

    Applicability {
        label,
        evidence: evidence_for(label, inclusion_hits.len()),
        inclusion_hits,
        exclusion_hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentsift_core::{KeywordSet, TextField};
    use std::collections::BTreeMap;

    fn record(text: &str) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert(TextField::Abstract, text.to_string());
        Record::new("US1", 0, fields, Default::default())
    }

    fn rules() -> ApplicabilityRules {
        ApplicabilityRules {
            inclusion: KeywordSet::new(["human", "patient", "clinical"]),
            exclusion: KeywordSet::new(["canine", "veterinary"]),
        }
    }

    #[test]
    fn test_animal_only() {
        let a = classify_applicability(&record("A canine formulation"), &rules());
        assert_eq!(a.label, ApplicabilityLabel::Animal);
        assert_eq!(a.exclusion_hits, vec!["canine"]);
        assert_eq!(a.evidence, None);
    }

    #[test]
    fn test_human_evidence() {
        let likely = classify_applicability(&record("Administered to a patient"), &rules());
        assert_eq!(likely.label, ApplicabilityLabel::Human);
        assert_eq!(likely.evidence, Some(HumanEvidence::Likely));

        let high = classify_applicability(&record("Human clinical use in patients"), &rules());
        assert_eq!(high.evidence, Some(HumanEvidence::High));
    }

    #[test]
    fn test_both_is_unclear() {
        let a = classify_applicability(&record("Veterinary and human patients"), &rules());
        assert_eq!(a.label, ApplicabilityLabel::Unclear);
        assert!(a.is_conflicted());
    }

    #[test]
    fn test_neither_is_unclear() {
        let a = classify_applicability(&record("A sequencing apparatus"), &rules());
        assert_eq!(a.label, ApplicabilityLabel::Unclear);
        assert!(!a.is_conflicted());
    }

    #[test]
    fn test_builtin_profile_keeps_preclinical_wording_human() {
        let rules = patentsift_core::PipelineConfig::builtin().unwrap().applicability;
        let a = classify_applicability(
            &record(
                "A peptide category of inhibitors, validated in an animal model and \
                 non-human primates, for human patients",
            ),
            &rules,
        );
        assert_eq!(a.label, ApplicabilityLabel::Human);
        assert!(a.exclusion_hits.is_empty());

        let vet = classify_applicability(&record("A canine chew for pet food"), &rules);
        assert_eq!(vet.label, ApplicabilityLabel::Animal);
    }

    #[test]
    fn test_empty_record_is_unclear() {
        let empty = Record::new("US2", 0, BTreeMap::new(), Default::default());
        assert_eq!(
            classify_applicability(&empty, &rules()).label,
            ApplicabilityLabel::Unclear
        );
    }
}
