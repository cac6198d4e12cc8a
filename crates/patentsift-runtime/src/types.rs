//! Pipeline run types: stage records, audit trail, stage reports, summary.

use std::collections::BTreeMap;

use patentsift_classify::{Applicability, ApplicabilityLabel, CategoryScore, TaxonomyAssignment};
use patentsift_core::{Dimension, Record};
use patentsift_ingest::DropReason;
use serde::Serialize;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalize,
    Score,
    Applicability,
    Taxonomy,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Self::Normalize,
            Self::Score,
            Self::Applicability,
            Self::Taxonomy,
        ]
    }
}

/// Why a record is absent from the ranked output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingIdentifier,
    DuplicateMerged,
    NoCategoryMatch,
    BelowThreshold,
    Animal,
    Unclear,
}

impl From<DropReason> for ExclusionReason {
    fn from(reason: DropReason) -> Self {
        match reason {
            DropReason::MissingIdentifier => Self::MissingIdentifier,
            DropReason::DuplicateMerged => Self::DuplicateMerged,
        }
    }
}

/// Normalized record plus its category score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: Record,
    pub score: CategoryScore,
}

/// Scored record plus its applicability label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRecord {
    #[serde(flatten)]
    pub scored: ScoredRecord,
    pub applicability: Applicability,
}

/// Fully annotated record in the ranked output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub labeled: LabeledRecord,
    pub taxonomy: TaxonomyAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indication: Option<String>,
}

impl ClassifiedRecord {
    pub fn record(&self) -> &Record {
        &self.labeled.scored.record
    }

    pub fn identifier(&self) -> &str {
        self.record().identifier()
    }

    pub fn score(&self) -> &CategoryScore {
        &self.labeled.scored.score
    }

    pub fn total_score(&self) -> f64 {
        self.score().total_score
    }

    pub fn applicability(&self) -> &Applicability {
        &self.labeled.applicability
    }
}

/// Stage-by-stage outcome of one raw input record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub source_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Last stage whose output includes this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub furthest_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<ExclusionReason>,
    /// Input index of the duplicate that replaced this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<usize>,
    /// Position among all normalized records by score (0-based).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicability: Option<Applicability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<TaxonomyAssignment>,
}

impl AuditEntry {
    pub(crate) fn new(source_index: usize) -> Self {
        Self {
            source_index,
            identifier: None,
            furthest_stage: None,
            exclusion: None,
            merged_into: None,
            score_rank: None,
            total_score: None,
            applicability: None,
            taxonomy: None,
        }
    }
}

/// Counts for one stage boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub input: usize,
    pub output: usize,
    pub excluded: BTreeMap<ExclusionReason, usize>,
}

impl StageReport {
    pub(crate) fn new(stage: Stage, input: usize) -> Self {
        Self {
            stage,
            input,
            output: 0,
            excluded: BTreeMap::new(),
        }
    }

    pub(crate) fn exclude(&mut self, reason: ExclusionReason) {
        *self.excluded.entry(reason).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// Aggregate view of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub raw_count: usize,
    pub normalized_count: usize,
    pub relevant_count: usize,
    pub ranked_count: usize,
    /// Labels over every normalized record.
    pub labels: BTreeMap<ApplicabilityLabel, usize>,
    /// Value counts per dimension over the ranked output.
    pub distribution: BTreeMap<Dimension, BTreeMap<String, usize>>,
    /// Ranked records per primary category.
    pub categories: BTreeMap<String, usize>,
    /// Most frequent matched keywords over the ranked output.
    pub top_keywords: Vec<TermCount>,
    pub top_assignees: Vec<TermCount>,
    /// Ranked records per publication year; undated records are not counted.
    pub publication_years: BTreeMap<i32, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranked_scores: Option<ScoreStats>,
}

/// Result of one pipeline run. Built once; not persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub config_name: String,
    pub config_version: u32,
    pub config_fingerprint: String,
    pub min_score: f64,
    pub stages: Vec<StageReport>,
    /// Normalized records with scores, in first-seen order.
    pub scored: Vec<ScoredRecord>,
    /// Human, above-threshold records by score desc, identifier asc.
    pub ranked: Vec<ClassifiedRecord>,
    /// One entry per raw input record, in input order.
    pub audit: Vec<AuditEntry>,
    pub summary: RunSummary,
    /// Opaque annotations from the enrichment collaborator, by identifier.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

impl PipelineRun {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Identifiers in the output of `stage`.
    ///
    /// `Normalize` yields first-seen order; later stages yield score order.
    pub fn stage_output(&self, stage: Stage) -> Vec<&str> {
        if stage == Stage::Normalize {
            return self.scored.iter().map(|s| s.record.identifier()).collect();
        }
        let mut passed: Vec<&AuditEntry> = self
            .audit
            .iter()
            .filter(|e| e.furthest_stage.is_some_and(|f| f >= stage))
            .collect();
        passed.sort_by_key(|e| e.score_rank);
        passed
            .into_iter()
            .filter_map(|e| e.identifier.as_deref())
            .collect()
    }

    /// Identifiers of the ranked output, in order.
    pub fn ranked_identifiers(&self) -> Vec<&str> {
        self.ranked.iter().map(ClassifiedRecord::identifier).collect()
    }

    pub fn audit_for(&self, identifier: &str) -> Option<&AuditEntry> {
        self.audit
            .iter()
            .find(|e| e.identifier.as_deref() == Some(identifier) && e.furthest_stage.is_some())
    }

    /// Ranked records grouped by their value on `dimension`.
    ///
    /// Groups are ordered by size descending, then value; records keep
    /// ranked order within a group.
    pub fn grouped_by(&self, dimension: Dimension) -> Vec<(String, Vec<&ClassifiedRecord>)> {
        let mut groups: BTreeMap<&str, Vec<&ClassifiedRecord>> = BTreeMap::new();
        for record in &self.ranked {
            groups
                .entry(record.taxonomy.value(dimension))
                .or_default()
                .push(record);
        }
        let mut groups: Vec<(String, Vec<&ClassifiedRecord>)> = groups
            .into_iter()
            .map(|(value, records)| (value.to_string(), records))
            .collect();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
        groups
    }
}
