//! PatentSift Classify: deterministic keyword classifiers.
//!
//! Three independent per-record stages, each a pure function of the record
//! and its slice of the pipeline configuration:
//! - [`scoring`]: additive category-weighted relevance score
//! - [`applicability`]: human / animal / unclear label
//! - [`taxonomy`]: first-match-wins value per dimension
//!
//! [`indication`] adds the treated indication for classified records.

pub mod applicability;
pub mod indication;
pub mod scoring;
pub mod taxonomy;

pub use applicability::{classify_applicability, Applicability, ApplicabilityLabel, HumanEvidence};
pub use indication::extract_indication;
pub use scoring::{score, CategoryMatch, CategoryScore};
pub use taxonomy::{classify, DimensionValue, TaxonomyAssignment};
