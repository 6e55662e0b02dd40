//! Per-type novelty of a submission against the submitter's history
//!
//! Both sides are first reduced to one secured-data object per contribution
//! type (last occurrence wins), then digest sets are compared field by field.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::types::{
    ComparisonReport, ComparisonResult, HashedField, NormalizedContribution, SecuredFields,
};

/// Which field keys are compared when a type has history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Only keys present in the historical object. Fields the submitter has
    /// never sent before are not counted at all.
    #[default]
    HistoricalFields,
    /// Keys present on either side; new fields count as fully unique.
    UnionFields,
}

impl FromStr for FieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "historical" => Ok(Self::HistoricalFields),
            "union" => Ok(Self::UnionFields),
            other => Err(format!(
                "unknown field policy '{other}' (expected 'historical' or 'union')"
            )),
        }
    }
}

impl fmt::Display for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HistoricalFields => write!(f, "historical"),
            Self::UnionFields => write!(f, "union"),
        }
    }
}

/// Contributions reduced to one secured-data object per type.
///
/// Types keep the position of their first occurrence; the data is that of
/// their last occurrence.
#[derive(Debug, Default)]
pub struct ByType<'a> {
    order: Vec<&'a str>,
    latest: HashMap<&'a str, &'a SecuredFields>,
}

impl<'a> ByType<'a> {
    pub fn reduce(contributions: &'a [NormalizedContribution]) -> Self {
        let mut reduced = Self::default();
        for contribution in contributions {
            let kind = contribution.contribution_type.as_str();
            if reduced
                .latest
                .insert(kind, &contribution.secured_shared_data)
                .is_none()
            {
                reduced.order.push(kind);
            }
        }
        reduced
    }

    pub fn get(&self, kind: &str) -> Option<&'a SecuredFields> {
        self.latest.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Types with their surviving data, in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a SecuredFields)> + '_ {
        self.order.iter().map(move |kind| (*kind, self.latest[kind]))
    }
}

/// Compare the current submission against aggregated history.
pub fn compare(
    current: &[NormalizedContribution],
    historical: &[NormalizedContribution],
    policy: FieldPolicy,
) -> ComparisonReport {
    let current = ByType::reduce(current);
    let historical = ByType::reduce(historical);

    let comparison_results: Vec<ComparisonResult> = current
        .iter()
        .map(|(kind, fields)| compare_type(kind, fields, historical.get(kind), policy))
        .collect();

    let total_normalized_score = if comparison_results.is_empty() {
        0.0
    } else {
        comparison_results
            .iter()
            .map(|r| r.type_unique_score)
            .sum::<f64>()
            / comparison_results.len() as f64
    };

    ComparisonReport {
        comparison_results,
        total_normalized_score,
    }
}

fn compare_type(
    kind: &str,
    current: &SecuredFields,
    historical: Option<&SecuredFields>,
    policy: FieldPolicy,
) -> ComparisonResult {
    let mut unique: HashSet<&str> = HashSet::new();
    let mut total: HashSet<&str> = HashSet::new();

    let type_unique_score = match historical {
        None => {
            for field in current.values() {
                total.extend(field.digests());
            }
            unique.extend(total.iter().copied());
            1.0
        }
        Some(old) => {
            for key in compared_keys(current, old, policy) {
                let old_field = old.get(key);
                let curr_field = current.get(key);

                let old_hashes: HashSet<&str> = old_field.map(digest_set).unwrap_or_default();
                let curr_hashes: HashSet<&str> = match (curr_field, old_field) {
                    (Some(curr), Some(old)) if curr.same_shape(old) => digest_set(curr),
                    (Some(curr), None) => digest_set(curr),
                    _ => HashSet::new(),
                };

                unique.extend(curr_hashes.difference(&old_hashes).copied());
                total.extend(curr_hashes);
            }

            if total.is_empty() {
                0.0
            } else {
                unique.len() as f64 / total.len() as f64
            }
        }
    };

    ComparisonResult {
        contribution_type: kind.to_string(),
        unique_hashes_in_curr: unique.len(),
        total_hashes_in_curr: total.len(),
        type_unique_score,
    }
}

fn compared_keys<'a>(
    current: &'a SecuredFields,
    old: &'a SecuredFields,
    policy: FieldPolicy,
) -> Vec<&'a str> {
    let mut keys: Vec<&str> = old.keys().map(String::as_str).collect();
    if policy == FieldPolicy::UnionFields {
        keys.extend(
            current
                .keys()
                .map(String::as_str)
                .filter(|k| !old.contains_key(*k)),
        );
    }
    keys
}

fn digest_set(field: &HashedField) -> HashSet<&str> {
    field.digests().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contribution;
    use crate::uniqueness::normalizer::normalize;
    use serde_json::{json, Value};

    fn normalized(entries: Value) -> Vec<NormalizedContribution> {
        let contributions: Vec<Contribution> = serde_json::from_value(entries).unwrap();
        normalize(&contributions)
    }

    #[test]
    fn test_type_without_history_is_fully_unique() {
        let current = normalized(json!([
            {"type": "GITHUB", "securedSharedData": {"login": "a", "repos": ["r1", "r2"]}}
        ]));

        let report = compare(&current, &[], FieldPolicy::HistoricalFields);
        let result = &report.comparison_results[0];

        assert_eq!(result.type_unique_score, 1.0);
        assert_eq!(result.unique_hashes_in_curr, 3);
        assert_eq!(result.unique_hashes_in_curr, result.total_hashes_in_curr);
        assert_eq!(report.total_normalized_score, 1.0);
    }

    #[test]
    fn test_identical_history_scores_zero() {
        let data = json!([
            {"type": "NETFLIX", "securedSharedData": {
                "profile": {"name": "a"}, "history": ["x", "y"], "email": "e"
            }}
        ]);
        let current = normalized(data.clone());
        let historical = normalized(data);

        let report = compare(&current, &historical, FieldPolicy::HistoricalFields);
        let result = &report.comparison_results[0];

        assert_eq!(result.type_unique_score, 0.0);
        assert_eq!(result.unique_hashes_in_curr, 0);
        assert_eq!(result.total_hashes_in_curr, 4);
    }

    #[test]
    fn test_half_changed_scores_half() {
        let current = normalized(json!([
            {"type": "REDDIT", "securedSharedData": {"a": "x", "b": "y"}}
        ]));
        let historical = normalized(json!([
            {"type": "REDDIT", "securedSharedData": {"a": "x", "b": "z"}}
        ]));

        let report = compare(&current, &historical, FieldPolicy::HistoricalFields);
        assert_eq!(report.comparison_results[0].type_unique_score, 0.5);
        assert_eq!(report.comparison_results[0].unique_hashes_in_curr, 1);
        assert_eq!(report.comparison_results[0].total_hashes_in_curr, 2);
    }

    #[test]
    fn test_average_over_types() {
        let current = normalized(json!([
            {"type": "A", "securedSharedData": {"k": "1"}},
            {"type": "B", "securedSharedData": {"k": "2"}},
            {"type": "C", "securedSharedData": {"k": "3", "j": "4"}}
        ]));
        let historical = normalized(json!([
            {"type": "B", "securedSharedData": {"k": "2"}},
            {"type": "C", "securedSharedData": {"k": "3", "j": "9"}}
        ]));

        let report = compare(&current, &historical, FieldPolicy::HistoricalFields);
        let scores: Vec<f64> = report
            .comparison_results
            .iter()
            .map(|r| r.type_unique_score)
            .collect();

        assert_eq!(scores, vec![1.0, 0.0, 0.5]);
        assert_eq!(report.total_normalized_score, 0.5);
    }

    #[test]
    fn test_no_types_scores_zero() {
        let report = compare(&[], &normalized(json!([])), FieldPolicy::HistoricalFields);
        assert!(report.comparison_results.is_empty());
        assert_eq!(report.total_normalized_score, 0.0);
    }

    #[test]
    fn test_new_field_ignored_by_historical_policy() {
        let current = normalized(json!([
            {"type": "SPOTIFY", "securedSharedData": {"a": "x", "fresh": ["n1", "n2"]}}
        ]));
        let historical = normalized(json!([
            {"type": "SPOTIFY", "securedSharedData": {"a": "x"}}
        ]));

        let reference = compare(&current, &historical, FieldPolicy::HistoricalFields);
        assert_eq!(reference.comparison_results[0].total_hashes_in_curr, 1);
        assert_eq!(reference.comparison_results[0].type_unique_score, 0.0);

        let union = compare(&current, &historical, FieldPolicy::UnionFields);
        assert_eq!(union.comparison_results[0].unique_hashes_in_curr, 2);
        assert_eq!(union.comparison_results[0].total_hashes_in_curr, 3);
        assert!((union.comparison_results[0].type_unique_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch_counts_nothing() {
        let current = normalized(json!([
            {"type": "STEAM", "securedSharedData": {"games": "single"}}
        ]));
        let historical = normalized(json!([
            {"type": "STEAM", "securedSharedData": {"games": ["g1"]}}
        ]));

        let report = compare(&current, &historical, FieldPolicy::HistoricalFields);
        assert_eq!(report.comparison_results[0].total_hashes_in_curr, 0);
        assert_eq!(report.comparison_results[0].type_unique_score, 0.0);
    }

    #[test]
    fn test_empty_history_object_scores_zero() {
        let current = normalized(json!([
            {"type": "UBER", "securedSharedData": {"trips": ["t1"]}}
        ]));
        let historical = normalized(json!([{"type": "UBER", "securedSharedData": {}}]));

        let report = compare(&current, &historical, FieldPolicy::HistoricalFields);
        assert_eq!(report.comparison_results[0].type_unique_score, 0.0);
    }

    #[test]
    fn test_reduce_last_write_wins_first_position() {
        let list = normalized(json!([
            {"type": "A", "securedSharedData": {"k": "first"}},
            {"type": "B", "securedSharedData": {"k": "b"}},
            {"type": "A", "securedSharedData": {"k": "second"}}
        ]));

        let reduced = ByType::reduce(&list);
        assert_eq!(reduced.len(), 2);
        let kinds: Vec<&str> = reduced.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec!["A", "B"]);
        assert_eq!(reduced.get("A"), Some(&list[2].secured_shared_data));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("historical".parse::<FieldPolicy>().unwrap(), FieldPolicy::HistoricalFields);
        assert_eq!("UNION".parse::<FieldPolicy>().unwrap(), FieldPolicy::UnionFields);
        assert!("both".parse::<FieldPolicy>().is_err());
        assert_eq!(FieldPolicy::UnionFields.to_string(), "union");
    }
}
