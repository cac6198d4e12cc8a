//! Versioned pipeline configuration.
//!
//! Every keyword list, weight, precedence list and threshold used by the
//! pipeline lives in one [`PipelineConfig`], loaded from JSON. The built-in
//! profile targets human therapeutic FOXP2 patents.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Error, Result};
use crate::keywords::KeywordSet;
use crate::record::{Dimension, UNCLASSIFIED};

/// Configuration schema version understood by this build.
pub const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding [`PipelineConfig::min_score`].
pub const MIN_SCORE_ENV: &str = "PATENTSIFT_MIN_SCORE";

const BUILTIN_PROFILE: &str = include_str!("../config/foxp2_therapeutics.json");

/// Keywords and weight for one relevance category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    pub keywords: KeywordSet,
    pub weight: f64,
}

/// Category name → rule. Iterated in name order.
pub type CategoryConfig = BTreeMap<String, CategoryRule>;

/// Inclusion (human) and exclusion (animal/veterinary) markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicabilityRules {
    pub inclusion: KeywordSet,
    pub exclusion: KeywordSet,
}

/// Which view of a record a taxonomy dimension matches against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// All text fields.
    #[default]
    Text,
    /// Assignee names.
    Assignees,
    /// Jurisdiction code.
    Jurisdiction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaxonomyRule {
    pub value: String,
    pub keywords: KeywordSet,
}

/// Ordered rules for one dimension; earlier rules take priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionRules {
    #[serde(default)]
    pub source: MatchSource,
    pub rules: Vec<TaxonomyRule>,
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub version: u32,
    #[serde(default)]
    pub name: String,
    /// Minimum `total_score` for a record to enter the relevant set.
    #[serde(default)]
    pub min_score: f64,
    pub categories: CategoryConfig,
    pub applicability: ApplicabilityRules,
    pub dimensions: BTreeMap<Dimension, DimensionRules>,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        info!(
            "Loaded pipeline config '{}' v{} from {}",
            config.name,
            config.version,
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate a configuration from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The compiled-in FOXP2 human therapeutics profile.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_PROFILE)
    }

    /// Apply `PATENTSIFT_MIN_SCORE` if set.
    pub fn with_env_overrides(self) -> Result<Self> {
        let raw = std::env::var(MIN_SCORE_ENV).ok();
        self.with_min_score_override(raw.as_deref())
    }

    /// Replace the threshold with a textual override, revalidating.
    pub fn with_min_score_override(mut self, raw: Option<&str>) -> Result<Self> {
        if let Some(raw) = raw {
            self.min_score = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} is not a number: {:?}", MIN_SCORE_ENV, raw))
            })?;
            self.validate()?;
        }
        Ok(self)
    }

    /// Reject configurations that would silently mis-classify records.
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(Error::Config(format!(
                "unsupported config version {} (expected {})",
                self.version, CONFIG_VERSION
            )));
        }
        if !self.min_score.is_finite() || self.min_score < 0.0 {
            return Err(Error::Config(format!(
                "min_score must be a finite non-negative number, got {}",
                self.min_score
            )));
        }

        if self.categories.is_empty() {
            return Err(Error::Config("no categories configured".into()));
        }
        for (name, rule) in &self.categories {
            if name.trim().is_empty() {
                return Err(Error::Config("category with blank name".into()));
            }
            check_keywords(&format!("category '{}'", name), &rule.keywords)?;
            if !rule.weight.is_finite() || rule.weight <= 0.0 {
                return Err(Error::Config(format!(
                    "category '{}' weight must be positive, got {}",
                    name, rule.weight
                )));
            }
        }

        check_keywords("applicability inclusion set", &self.applicability.inclusion)?;
        check_keywords("applicability exclusion set", &self.applicability.exclusion)?;

        for dimension in Dimension::all() {
            let Some(dim) = self.dimensions.get(dimension) else {
                return Err(Error::Config(format!("dimension '{}' has no rules", dimension)));
            };
            if dim.rules.is_empty() {
                return Err(Error::Config(format!("dimension '{}' has an empty rule list", dimension)));
            }
            for (i, rule) in dim.rules.iter().enumerate() {
                let value = rule.value.trim();
                if value.is_empty() || value.eq_ignore_ascii_case(UNCLASSIFIED) {
                    return Err(Error::Config(format!(
                        "dimension '{}' rule {} has a blank or reserved value {:?}",
                        dimension, i, rule.value
                    )));
                }
                check_keywords(&format!("dimension '{}' rule '{}'", dimension, value), &rule.keywords)?;
            }
        }

        Ok(())
    }

    /// SHA-256 of the canonical serialized configuration.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

fn check_keywords(what: &str, keywords: &KeywordSet) -> Result<()> {
    if keywords.is_empty() {
        return Err(Error::Config(format!("{} has no keywords", what)));
    }
    if keywords.has_blank() {
        return Err(Error::Config(format!("{} contains a blank keyword", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        let dims: serde_json::Map<String, serde_json::Value> = Dimension::all()
            .iter()
            .map(|d| {
                (
                    d.to_string(),
                    serde_json::json!({"rules": [{"value": "x", "keywords": ["x"]}]}),
                )
            })
            .collect();
        serde_json::json!({
            "version": 1,
            "name": "minimal",
            "categories": {"drugs": {"keywords": ["ligand"], "weight": 3.0}},
            "applicability": {"inclusion": ["patient"], "exclusion": ["canine"]},
            "dimensions": dims,
        })
    }

    fn parse(value: serde_json::Value) -> Result<PipelineConfig> {
        PipelineConfig::from_json_str(&value.to_string())
    }

    #[test]
    fn test_builtin_profile_is_valid() {
        let config = PipelineConfig::builtin().unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.categories.contains_key("compounds_drugs"));
        assert_eq!(config.dimensions.len(), Dimension::all().len());
        assert_eq!(
            config.dimensions[&Dimension::InstitutionType].source,
            MatchSource::Assignees
        );
    }

    #[test]
    fn test_minimal_config() {
        let config = parse(minimal_json()).unwrap();
        assert_eq!(config.min_score, 0.0);
        assert_eq!(
            config.dimensions[&Dimension::TherapeuticArea].source,
            MatchSource::Text
        );
    }

    #[test]
    fn test_rejects_empty_categories() {
        let mut v = minimal_json();
        v["categories"] = serde_json::json!({});
        assert!(matches!(parse(v), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_non_positive_weight() {
        let mut v = minimal_json();
        v["categories"]["drugs"]["weight"] = serde_json::json!(0.0);
        assert!(matches!(parse(v), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_missing_dimension() {
        let mut v = minimal_json();
        v["dimensions"].as_object_mut().unwrap().remove("jurisdiction");
        let err = parse(v).unwrap_err();
        assert!(err.to_string().contains("jurisdiction"));
    }

    #[test]
    fn test_rejects_empty_rule_list() {
        let mut v = minimal_json();
        v["dimensions"]["molecule_type"]["rules"] = serde_json::json!([]);
        assert!(matches!(parse(v), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_reserved_value() {
        let mut v = minimal_json();
        v["dimensions"]["molecule_type"]["rules"][0]["value"] = serde_json::json!("Unclassified");
        assert!(matches!(parse(v), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_blank_keyword() {
        let mut v = minimal_json();
        v["applicability"]["exclusion"] = serde_json::json!(["canine", "   "]);
        assert!(matches!(parse(v), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_field() {
        let mut v = minimal_json();
        v["weights"] = serde_json::json!({});
        assert!(matches!(parse(v), Err(Error::Json(_))));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut v = minimal_json();
        v["version"] = serde_json::json!(2);
        assert!(matches!(parse(v), Err(Error::Config(_))));
    }

    #[test]
    fn test_min_score_override() {
        let config = parse(minimal_json()).unwrap();
        let config = config.with_min_score_override(Some(" 7.5 ")).unwrap();
        assert_eq!(config.min_score, 7.5);
        assert!(config.clone().with_min_score_override(Some("-1")).is_err());
        assert!(config.clone().with_min_score_override(Some("lots")).is_err());
        assert_eq!(config.with_min_score_override(None).unwrap().min_score, 7.5);
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = parse(minimal_json()).unwrap();
        let b = parse(minimal_json()).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);

        let mut v = minimal_json();
        v["categories"]["drugs"]["weight"] = serde_json::json!(2.0);
        let c = parse(v).unwrap();
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, minimal_json().to_string()).unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.name, "minimal");

        let missing = dir.path().join("missing.json");
        assert!(matches!(PipelineConfig::load(&missing), Err(Error::Io(_))));
    }
}
