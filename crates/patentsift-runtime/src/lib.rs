//! Runtime orchestrator: sequences the pipeline stages and builds the run.
//!
//! Provides the `Pipeline` (normalize, score, label, classify, rank), the
//! `PipelineRun` audit object it returns, and the optional enrichment hook.

pub mod enrich;
pub mod orchestrator;
pub mod types;

pub use enrich::{NarrativeAnalyzer, NoopAnalyzer};
pub use orchestrator::{run, Pipeline};
pub use types::*;
