//! Per-dimension scores and their weighted combination

pub mod authenticity;
pub mod quality;

pub use authenticity::authenticity_score;
pub use quality::{quality_score, QualityReport, TypeScore};

pub const AUTHENTICITY_WEIGHT: f64 = 0.003;
pub const OWNERSHIP_WEIGHT: f64 = 0.005;
pub const UNIQUENESS_WEIGHT: f64 = 0.342;
pub const QUALITY_WEIGHT: f64 = 0.650;

/// Weighted sum of the four dimension scores
pub fn final_score(authenticity: f64, ownership: f64, uniqueness: f64, quality: f64) -> f64 {
    AUTHENTICITY_WEIGHT * authenticity
        + OWNERSHIP_WEIGHT * ownership
        + UNIQUENESS_WEIGHT * uniqueness
        + QUALITY_WEIGHT * quality
}
