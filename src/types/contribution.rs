//! Contribution data model
//!
//! Wire shapes shared by the input files, the cache store and the
//! validator directory. Field names follow the JSON the data pool emits
//! (`securedSharedData`, `fileId`, ...), so every struct renames explicitly.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One disclosed data unit from a submitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Category tag, e.g. `NETFLIX` or `GITHUB`
    #[serde(rename = "type", default)]
    pub contribution_type: String,

    /// Fields whose leaf values are hashed before comparison or storage
    #[serde(rename = "securedSharedData", default)]
    pub secured_shared_data: Map<String, Value>,

    /// Provenance URLs, checked by the authenticity score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witnesses: Option<Value>,
}

/// A submission file: the submitter plus their contributions
///
/// Older producers write the list under `contribution`, newer ones under
/// `contributions`; both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "walletAddress", default)]
    pub wallet_address: Option<String>,

    #[serde(rename = "contribution", alias = "contributions", default)]
    pub contributions: Vec<Contribution>,
}

impl Submission {
    /// Contribution types in submission order (duplicates kept)
    pub fn types(&self) -> Vec<String> {
        self.contributions
            .iter()
            .map(|c| c.contribution_type.clone())
            .collect()
    }
}

/// A secured field after hashing
///
/// Keeps the shape of the source field: flat objects stay objects, lists
/// stay lists, scalars collapse to a single digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HashedField {
    Digest(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl HashedField {
    /// Every digest held by this field
    pub fn digests(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Digest(d) => Box::new(std::iter::once(d.as_str())),
            Self::List(items) => Box::new(items.iter().map(String::as_str)),
            Self::Map(entries) => Box::new(entries.values().map(String::as_str)),
        }
    }

    /// True when both fields have the same shape (digest/list/map)
    pub fn same_shape(&self, other: &HashedField) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Hashed secured data, keyed by field name
pub type SecuredFields = BTreeMap<String, HashedField>;

/// A contribution whose secured leaves have been replaced by digests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedContribution {
    #[serde(rename = "type")]
    pub contribution_type: String,

    #[serde(rename = "securedSharedData")]
    pub secured_shared_data: SecuredFields,
}

/// Reference to one prior submission of the same submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalFile {
    #[serde(rename = "fileId", deserialize_with = "string_or_number")]
    pub file_id: String,

    #[serde(rename = "fileUrl", default)]
    pub file_url: Option<String>,
}

/// Per-type novelty of the current submission against history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(rename = "type")]
    pub contribution_type: String,
    pub unique_hashes_in_curr: usize,
    pub total_hashes_in_curr: usize,
    pub type_unique_score: f64,
}

/// Output of a comparison: per-type results plus their mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub comparison_results: Vec<ComparisonResult>,
    pub total_normalized_score: f64,
}

/// Unique-entry summary handed to quality scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueEntry {
    #[serde(rename = "type")]
    pub contribution_type: String,
    pub unique_entry_count: usize,
    pub type_unique_score: f64,
}

impl From<&ComparisonResult> for UniqueEntry {
    fn from(result: &ComparisonResult) -> Self {
        Self {
            contribution_type: result.contribution_type.clone(),
            unique_entry_count: result.unique_hashes_in_curr,
            type_unique_score: result.type_unique_score,
        }
    }
}

/// Uniqueness outcome for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniquenessOutcome {
    pub unique_entries: Vec<UniqueEntry>,
    pub uniqueness_score: f64,
}

impl From<ComparisonReport> for UniquenessOutcome {
    fn from(report: ComparisonReport) -> Self {
        Self {
            unique_entries: report.comparison_results.iter().map(UniqueEntry::from).collect(),
            uniqueness_score: report.total_normalized_score,
        }
    }
}

/// Directory services hand out file ids as either strings or integers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for fileId, got {other}"
        ))),
    }
}
