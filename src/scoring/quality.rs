//! Quality: points per contribution type, scaled by how much of it is new
//!
//! Order-style sources (ride, shopping, food, streaming histories) are tiered
//! on the number of unique entries. Profile-style sources scale linearly
//! with the type's uniqueness score.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::types::{Contribution, UniqueEntry};

/// Maximum points per known contribution type
pub fn type_points(kind: &str) -> Option<f64> {
    let points = match kind {
        "REDDIT" => 15.0,
        "STEAM" => 10.0,
        "UBER" => 15.0,
        "LINKEDIN" => 25.0,
        "TWITCH" => 10.0,
        "AMAZON_PRIME" => 25.0,
        "NETFLIX" => 25.0,
        "ZOMATO" => 15.0,
        "SPOTIFY" => 15.0,
        "GITHUB" => 10.0,
        "TWITTER" => 10.0,
        _ => return None,
    };
    Some(points)
}

const ORDER_TYPES: &[&str] = &["UBER", "AMAZON_PRIME", "ZOMATO", "SPOTIFY", "NETFLIX"];
const PROFILE_TYPES: &[&str] = &["REDDIT", "STEAM", "TWITCH", "TWITTER", "LINKEDIN", "GITHUB"];

/// Tiered points for an order-style type
pub fn tiered_points(max_points: f64, unique_entries: usize) -> f64 {
    match unique_entries {
        10.. => max_points,
        5..=9 => max_points * 0.5,
        1..=4 => max_points * 0.1,
        0 => 0.0,
    }
}

/// Score breakdown for one contribution type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeScore {
    pub type_points: f64,
    pub type_uniqueness_score: f64,
    pub type_quality_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub quality_score: f64,
    pub type_scores: BTreeMap<String, TypeScore>,
}

/// Score every contribution against the uniqueness entries of its type.
///
/// Unknown types earn nothing and do not raise the maximum. A type that
/// repeats is counted each time it appears, and its breakdown reflects the
/// last occurrence.
pub fn quality_score(contributions: &[Contribution], unique_entries: &[UniqueEntry]) -> QualityReport {
    let by_type: HashMap<&str, &UniqueEntry> = unique_entries
        .iter()
        .map(|e| (e.contribution_type.as_str(), e))
        .collect();

    let mut type_scores = BTreeMap::new();
    let mut secured = 0.0;
    let mut max_total = 0.0;

    for contribution in contributions {
        let kind = contribution.contribution_type.as_str();
        let (unique_count, uniqueness) = by_type
            .get(kind)
            .map_or((0, 0.0), |e| (e.unique_entry_count, e.type_unique_score));

        let max_points = type_points(kind);
        let points = match max_points {
            Some(max) if ORDER_TYPES.contains(&kind) => tiered_points(max, unique_count),
            Some(max) if PROFILE_TYPES.contains(&kind) => max * uniqueness,
            _ => 0.0,
        };
        let type_quality_score = match max_points {
            Some(max) if max > 0.0 => points / max,
            _ => 0.0,
        };

        max_total += max_points.unwrap_or(0.0);
        secured += points;

        type_scores.insert(
            kind.to_string(),
            TypeScore {
                type_points: points,
                type_uniqueness_score: uniqueness,
                type_quality_score,
            },
        );
    }

    let quality_score = if max_total > 0.0 { secured / max_total } else { 0.0 };
    debug!(secured, max_total, quality_score, "Quality computed");

    QualityReport {
        quality_score,
        type_scores,
    }
}
