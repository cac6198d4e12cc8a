//! Specific indication extraction ("for the treatment of X").

use once_cell::sync::Lazy;
use patentsift_core::Record;
use regex::Regex;

const MAX_INDICATION_CHARS: usize = 100;

/// Phrase patterns tried in order; the first pattern with a match wins.
static INDICATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"treating\s+([^,.;]+)",
        r"treatment\s+of\s+([^,.;]+)",
        r"therapy\s+for\s+([^,.;]+)",
        r"therapeutic\s+treatment\s+of\s+([^,.;]+)",
        r"for\s+the\s+treatment\s+of\s+([^,.;]+)",
        r"use\s+in\s+treating\s+([^,.;]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ONCOLOGY_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+\s+(?:cancer|carcinoma|tumor)").unwrap());

static NEUROLOGY_FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"autism|speech disorder|language disorder|cognitive disorder").unwrap()
});

/// Extract the indication a record claims to treat.
///
/// Falls back to area-specific disease mentions for `oncology` and
/// `neurology_psychiatry`. Returned text is lower-case.
pub fn extract_indication(record: &Record, therapeutic_area: &str) -> Option<String> {
    let text = record.folded_text();

    let phrase = INDICATION_PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
    });

    let found = phrase.or_else(|| {
        let fallback = match therapeutic_area {
            "oncology" => &*ONCOLOGY_FALLBACK,
            "neurology_psychiatry" => &*NEUROLOGY_FALLBACK,
            _ => return None,
        };
        fallback.find(text).map(|m| m.as_str())
    })?;

    Some(found.chars().take(MAX_INDICATION_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentsift_core::TextField;
    use std::collections::BTreeMap;

    fn record(text: &str) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert(TextField::Abstract, text.to_string());
        Record::new("US1", 0, fields, Default::default())
    }

    #[test]
    fn test_treatment_phrase() {
        let r = record("Compounds for the Treatment of Autism Spectrum Disorder, and uses.");
        assert_eq!(
            extract_indication(&r, "neurology_psychiatry").as_deref(),
            Some("autism spectrum disorder")
        );
    }

    #[test]
    fn test_earlier_pattern_wins() {
        let r = record("Therapy for speech delay. Methods of treating verbal dyspraxia.");
        assert_eq!(extract_indication(&r, "").as_deref(), Some("verbal dyspraxia"));
    }

    #[test]
    fn test_oncology_fallback() {
        let r = record("FOXP2 expression in adenoid cystic carcinoma samples");
        assert_eq!(
            extract_indication(&r, "oncology").as_deref(),
            Some("cystic carcinoma")
        );
        assert_eq!(extract_indication(&r, "diagnostics"), None);
    }

    #[test]
    fn test_truncated() {
        let long = format!("treating {}", "x".repeat(300));
        let r = record(&long);
        assert_eq!(extract_indication(&r, "").unwrap().len(), MAX_INDICATION_CHARS);
    }
}
