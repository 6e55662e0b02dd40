//! Shared types: data model and errors

pub mod contribution;
pub mod error;

pub use contribution::{
    ComparisonReport, ComparisonResult, Contribution, HashedField, HistoricalFile,
    NormalizedContribution, SecuredFields, Submission, UniqueEntry, UniquenessOutcome,
};
pub use error::{ProofError, Result};
