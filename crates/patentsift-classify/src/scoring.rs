//! Category-weighted relevance scoring.
//!
//! Each category contributes `distinct matched keywords × weight`. Repeating
//! a keyword never raises the score, and a keyword listed under two
//! categories counts in both.

use std::collections::BTreeMap;

use patentsift_core::{CategoryConfig, Record};
use serde::Serialize;

/// Matches of one category against one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMatch {
    pub matched_keywords: Vec<String>,
    pub match_count: usize,
    pub weight: f64,
    pub weighted_score: f64,
}

/// Relevance score of a record across all configured categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryScore {
    pub categories: BTreeMap<String, CategoryMatch>,
    pub total_score: f64,
    /// Category with the highest weighted contribution; ties go to the
    /// lexically smaller name. `None` for a zero score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
}

impl CategoryScore {
    /// True when no category matched.
    pub fn is_zero(&self) -> bool {
        self.categories.values().all(|m| m.match_count == 0)
    }

    pub fn match_count(&self, category: &str) -> usize {
        self.categories.get(category).map_or(0, |m| m.match_count)
    }

    /// Distinct matched keywords across all categories, in name order.
    pub fn matched_keywords(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for m in self.categories.values() {
            for kw in &m.matched_keywords {
                if !seen.contains(&kw.as_str()) {
                    seen.push(kw);
                }
            }
        }
        seen
    }
}

fn primary_category(categories: &BTreeMap<String, CategoryMatch>) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for (name, m) in categories {
        if m.match_count == 0 {
            continue;
        }
        if best.map_or(true, |(_, s)| m.weighted_score > s) {
            best = Some((name.as_str(), m.weighted_score));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// Score a record against the category configuration.
pub fn score(record: &Record, categories: &CategoryConfig) -> CategoryScore {
    let text = record.folded_text();
    let mut result = CategoryScore::default();

    for (name, rule) in categories {
        let matched: Vec<String> = rule
            .keywords
            .matches(text)
            .into_iter()
            .map(str::to_string)
            .collect();
        let match_count = matched.len();
        let weighted_score = match_count as f64 * rule.weight;
        result.total_score += weighted_score;
        result.categories.insert(
            name.clone(),
            CategoryMatch {
                matched_keywords: matched,
                match_count,
                weight: rule.weight,
                weighted_score,
            },
        );
    }

    result.primary_category = primary_category(&result.categories);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentsift_core::{CategoryRule, KeywordSet, TextField};

    fn record(title: &str, abstract_text: &str) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert(TextField::Title, title.to_string());
        if !abstract_text.is_empty() {
            fields.insert(TextField::Abstract, abstract_text.to_string());
        }
        Record::new("US1", 0, fields, Default::default())
    }

    fn categories() -> CategoryConfig {
        let mut c = CategoryConfig::new();
        c.insert(
            "compounds_drugs".into(),
            CategoryRule {
                keywords: KeywordSet::new(["ligand", "small molecule", "inhibitor"]),
                weight: 3.0,
            },
        );
        c.insert(
            "diseases".into(),
            CategoryRule {
                keywords: KeywordSet::new(["cancer", "autism"]),
                weight: 1.2,
            },
        );
        c
    }

    #[test]
    fn test_weighted_sum() {
        let s = score(&record("CRBN ligand", "Treats cancer."), &categories());
        assert_eq!(s.match_count("compounds_drugs"), 1);
        assert_eq!(s.match_count("diseases"), 1);
        assert!((s.total_score - 4.2).abs() < 1e-9);
        assert_eq!(s.primary_category.as_deref(), Some("compounds_drugs"));
        assert_eq!(s.matched_keywords(), vec!["ligand", "cancer"]);
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        let once = score(&record("cancer", ""), &categories());
        let many = score(&record("cancer", "cancer CANCER cancer cancer"), &categories());
        assert_eq!(once.total_score, many.total_score);
        assert_eq!(many.match_count("diseases"), 1);
    }

    #[test]
    fn test_overlapping_keyword_scores_in_both() {
        let mut c = categories();
        c.insert(
            "targets".into(),
            CategoryRule {
                keywords: KeywordSet::new(["ligand"]),
                weight: 2.0,
            },
        );
        let s = score(&record("ligand", ""), &c);
        assert!((s.total_score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_score_for_empty_text() {
        let empty = Record::new("US2", 0, BTreeMap::new(), Default::default());
        let s = score(&empty, &categories());
        assert!(s.is_zero());
        assert_eq!(s.total_score, 0.0);
        assert_eq!(s.primary_category, None);
        assert_eq!(s.categories.len(), 2);
    }

    #[test]
    fn test_deterministic() {
        let r = record("small molecule inhibitor", "for autism and cancer");
        assert_eq!(score(&r, &categories()), score(&r, &categories()));
    }
}
