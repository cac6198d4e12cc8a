//! Optional narrative enrichment of ranked records.
//!
//! The `NarrativeAnalyzer` trait abstracts over whatever produces free-form
//! annotations (an LLM, a rules engine, a human review queue). Annotations
//! are attached after ranking and never change scores, labels or order.
//! Implementations:
//! - `NoopAnalyzer`: never annotates; the default when nothing is configured.

use patentsift_core::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::types::{ClassifiedRecord, PipelineRun};

/// Trait for enrichment backends.
pub trait NarrativeAnalyzer: Send + Sync {
    /// Annotate one ranked record. `Ok(None)` means nothing to add.
    fn analyze(&self, record: &ClassifiedRecord) -> Result<Option<Value>>;

    /// Check if the analyzer can be called at all.
    fn is_available(&self) -> bool;
}

/// Analyzer that never annotates.
pub struct NoopAnalyzer;

impl NarrativeAnalyzer for NoopAnalyzer {
    fn analyze(&self, _record: &ClassifiedRecord) -> Result<Option<Value>> {
        Ok(None)
    }

    fn is_available(&self) -> bool {
        false
    }
}

impl PipelineRun {
    /// Attach annotations from `analyzer` to ranked records.
    ///
    /// Analyzer failures are logged and skipped. Returns the number of
    /// records annotated.
    pub fn enrich(&mut self, analyzer: &dyn NarrativeAnalyzer) -> usize {
        if !analyzer.is_available() {
            debug!("Narrative analyzer unavailable, skipping enrichment");
            return 0;
        }

        let mut annotated = 0;
        for record in &self.ranked {
            match analyzer.analyze(record) {
                Ok(Some(annotation)) => {
                    self.annotations
                        .insert(record.identifier().to_string(), annotation);
                    annotated += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Enrichment failed for {}: {}", record.identifier(), e),
            }
        }

        info!(
            "Enrichment complete: {}/{} records annotated",
            annotated,
            self.ranked.len()
        );
        annotated
    }
}
