//! PatentSift Core: record model, keyword sets, pipeline configuration.

pub mod config;
pub mod error;
pub mod keywords;
pub mod record;

pub use config::{
    ApplicabilityRules, CategoryConfig, CategoryRule, DimensionRules, MatchSource,
    PipelineConfig, TaxonomyRule,
};
pub use error::{Error, Result};
pub use keywords::KeywordSet;
pub use record::{
    Dimension, RawRecord, Record, RecordMetadata, TextField, UNCLASSIFIED,
};
