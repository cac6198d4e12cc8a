//! Pipeline orchestrator: normalize → score → applicability → taxonomy → rank.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Datelike;
use patentsift_classify::{
    classify, classify_applicability, extract_indication, ApplicabilityLabel,
};
use patentsift_core::{Dimension, PipelineConfig, RawRecord, Result};
use patentsift_ingest::Normalizer;
use tracing::{debug, info};

use crate::types::*;

const TOP_KEYWORDS: usize = 20;
const TOP_ASSIGNEES: usize = 10;

/// A validated pipeline, ready to run over any number of batches.
pub struct Pipeline {
    config: PipelineConfig,
    fingerprint: String,
}

impl Pipeline {
    /// Validate `config` and build a pipeline. Configuration errors are
    /// reported here, before any record is processed.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let fingerprint = config.fingerprint()?;

        info!(
            "Pipeline initialized: config={} v{}, categories={}, min_score={}",
            config.name,
            config.version,
            config.categories.len(),
            config.min_score
        );

        Ok(Self {
            config,
            fingerprint,
        })
    }

    /// Pipeline over the built-in profile.
    pub fn builtin() -> Result<Self> {
        Self::new(PipelineConfig::builtin()?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Run every stage over `raw_records`.
    ///
    /// Infallible once the pipeline exists: malformed records are dropped
    /// into the audit trail and empty records degrade to a zero score.
    pub fn run(&self, raw_records: &[RawRecord]) -> PipelineRun {
        let start = std::time::Instant::now();
        let config = &self.config;

        info!("Starting pipeline run over {} raw records", raw_records.len());

        // Stage 1: normalize and deduplicate
        let batch = Normalizer::normalize(raw_records);
        let mut normalize_report = StageReport::new(Stage::Normalize, raw_records.len());
        normalize_report.output = batch.records.len();

        let mut audit: Vec<AuditEntry> = Vec::with_capacity(raw_records.len());
        for dropped in &batch.dropped {
            let reason = ExclusionReason::from(dropped.reason);
            normalize_report.exclude(reason);
            audit.push(AuditEntry {
                identifier: dropped.identifier.clone(),
                exclusion: Some(reason),
                merged_into: dropped.kept_source_index,
                ..AuditEntry::new(dropped.source_index)
            });
        }

        // Stage 2: score, then rank everything by score
        let scored: Vec<ScoredRecord> = batch
            .records
            .into_iter()
            .map(|record| {
                let score = patentsift_classify::score(&record, &config.categories);
                ScoredRecord { record, score }
            })
            .collect();

        let mut order: Vec<usize> = (0..scored.len()).collect();
        order.sort_by(|&a, &b| rank_order(&scored[a], &scored[b]));

        let mut score_report = StageReport::new(Stage::Score, scored.len());
        let mut applicability_report = StageReport::new(Stage::Applicability, 0);
        let mut taxonomy_report = StageReport::new(Stage::Taxonomy, 0);
        let mut labels: BTreeMap<ApplicabilityLabel, usize> = BTreeMap::new();
        let mut ranked: Vec<ClassifiedRecord> = Vec::new();

        for (score_rank, &index) in order.iter().enumerate() {
            let entry = &scored[index];
            let record = &entry.record;
            let total = entry.score.total_score;

            // Stage 3: every normalized record gets a label
            let applicability = classify_applicability(record, &config.applicability);
            *labels.entry(applicability.label).or_insert(0) += 1;

            // Stage 4: every human record gets a taxonomy
            let taxonomy = applicability
                .is_human()
                .then(|| classify(record, &config.dimensions));

            let mut furthest = Stage::Normalize;
            let exclusion = if entry.score.is_zero() {
                Some(ExclusionReason::NoCategoryMatch)
            } else if total < config.min_score {
                Some(ExclusionReason::BelowThreshold)
            } else {
                furthest = Stage::Score;
                match applicability.label {
                    ApplicabilityLabel::Human => None,
                    ApplicabilityLabel::Animal => Some(ExclusionReason::Animal),
                    ApplicabilityLabel::Unclear => Some(ExclusionReason::Unclear),
                }
            };

            match exclusion {
                Some(reason @ (ExclusionReason::NoCategoryMatch | ExclusionReason::BelowThreshold)) => {
                    score_report.exclude(reason);
                }
                Some(reason) => {
                    applicability_report.exclude(reason);
                }
                None => {}
            }

            if furthest == Stage::Score {
                score_report.output += 1;
                applicability_report.input += 1;
            }

            if let (None, Some(taxonomy)) = (exclusion, taxonomy.as_ref()) {
                furthest = Stage::Taxonomy;
                applicability_report.output += 1;
                taxonomy_report.input += 1;
                taxonomy_report.output += 1;

                let area = taxonomy.value(Dimension::TherapeuticArea);
                ranked.push(ClassifiedRecord {
                    indication: extract_indication(record, area),
                    labeled: LabeledRecord {
                        scored: entry.clone(),
                        applicability: applicability.clone(),
                    },
                    taxonomy: taxonomy.clone(),
                });
            }

            debug!(
                "{}: score={}, label={}, exclusion={:?}",
                record.identifier(),
                total,
                applicability.label,
                exclusion
            );

            audit.push(AuditEntry {
                identifier: Some(record.identifier().to_string()),
                furthest_stage: Some(furthest),
                exclusion,
                score_rank: Some(score_rank),
                total_score: Some(total),
                applicability: Some(applicability),
                taxonomy,
                ..AuditEntry::new(record.source_index())
            });
        }

        audit.sort_by_key(|e| e.source_index);

        let summary = summarize(raw_records.len(), &scored, &score_report, labels, &ranked);

        info!(
            "Pipeline complete: raw={}, normalized={}, relevant={}, ranked={}, duration={}ms",
            summary.raw_count,
            summary.normalized_count,
            summary.relevant_count,
            summary.ranked_count,
            start.elapsed().as_millis()
        );

        PipelineRun {
            config_name: config.name.clone(),
            config_version: config.version,
            config_fingerprint: self.fingerprint.clone(),
            min_score: config.min_score,
            stages: vec![
                normalize_report,
                score_report,
                applicability_report,
                taxonomy_report,
            ],
            scored,
            ranked,
            audit,
            summary,
            annotations: BTreeMap::new(),
        }
    }
}

/// Validate `config` and run it once over `raw_records`.
pub fn run(raw_records: &[RawRecord], config: &PipelineConfig) -> Result<PipelineRun> {
    let pipeline = Pipeline::new(config.clone())?;
    Ok(pipeline.run(raw_records))
}

/// Score descending, then identifier ascending. Scores are finite.
fn rank_order(a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    b.score
        .total_score
        .total_cmp(&a.score.total_score)
        .then_with(|| a.record.identifier().cmp(b.record.identifier()))
}

fn summarize(
    raw_count: usize,
    scored: &[ScoredRecord],
    score_report: &StageReport,
    labels: BTreeMap<ApplicabilityLabel, usize>,
    ranked: &[ClassifiedRecord],
) -> RunSummary {
    let mut distribution: BTreeMap<Dimension, BTreeMap<String, usize>> = BTreeMap::new();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut keywords: BTreeMap<String, usize> = BTreeMap::new();
    let mut assignees: BTreeMap<String, usize> = BTreeMap::new();
    let mut publication_years: BTreeMap<i32, usize> = BTreeMap::new();

    for record in ranked {
        for (dimension, value) in record.taxonomy.iter() {
            *distribution
                .entry(dimension)
                .or_default()
                .entry(value.value.clone())
                .or_insert(0) += 1;
        }
        if let Some(primary) = &record.score().primary_category {
            *categories.entry(primary.clone()).or_insert(0) += 1;
        }
        for keyword in record.score().matched_keywords() {
            *keywords.entry(keyword.to_string()).or_insert(0) += 1;
        }
        let metadata = record.record().metadata();
        for assignee in &metadata.assignees {
            *assignees.entry(assignee.clone()).or_insert(0) += 1;
        }
        if let Some(date) = metadata.publication_date {
            *publication_years.entry(date.year()).or_insert(0) += 1;
        }
    }

    let ranked_scores = if ranked.is_empty() {
        None
    } else {
        let scores: Vec<f64> = ranked.iter().map(ClassifiedRecord::total_score).collect();
        Some(ScoreStats {
            // Ranked output is sorted by score descending.
            min: scores[scores.len() - 1],
            max: scores[0],
            mean: scores.iter().sum::<f64>() / scores.len() as f64,
        })
    };

    RunSummary {
        raw_count,
        normalized_count: scored.len(),
        relevant_count: score_report.output,
        ranked_count: ranked.len(),
        labels,
        distribution,
        categories,
        top_keywords: top_counts(keywords, TOP_KEYWORDS),
        top_assignees: top_counts(assignees, TOP_ASSIGNEES),
        publication_years,
        ranked_scores,
    }
}

/// Highest counts first, ties by term; at most `limit` rows.
fn top_counts(counts: BTreeMap<String, usize>, limit: usize) -> Vec<TermCount> {
    let mut rows: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    // Stable sort keeps the map's term order within equal counts.
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(limit);
    rows
}
