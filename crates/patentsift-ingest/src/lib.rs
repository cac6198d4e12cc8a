//! PatentSift Ingest: raw record normalization and deduplication.

pub mod normalize;

pub use normalize::{
    DropReason, DroppedRecord, NormalizedBatch, Normalizer, canonical_identifier, completeness,
    parse_date,
};
