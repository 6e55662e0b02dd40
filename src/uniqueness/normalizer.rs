//! Secured-data normalization: replace every leaf with its digest

use serde_json::Value;

use super::hasher::hash_value;
use crate::types::{Contribution, HashedField, NormalizedContribution, SecuredFields};

/// Hash the secured data of every contribution, preserving order and shape.
///
/// Objects map the same keys to leaf digests, arrays keep their length and
/// order, scalars become a single digest. Anything nested deeper than one
/// level is hashed whole through its canonical rendering.
pub fn normalize(contributions: &[Contribution]) -> Vec<NormalizedContribution> {
    contributions
        .iter()
        .map(|contribution| NormalizedContribution {
            contribution_type: contribution.contribution_type.clone(),
            secured_shared_data: normalize_fields(&contribution.secured_shared_data),
        })
        .collect()
}

fn normalize_fields(fields: &serde_json::Map<String, Value>) -> SecuredFields {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), normalize_field(value)))
        .collect()
}

fn normalize_field(value: &Value) -> HashedField {
    match value {
        Value::Object(entries) => HashedField::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), hash_value(v)))
                .collect(),
        ),
        Value::Array(items) => HashedField::List(items.iter().map(hash_value).collect()),
        scalar => HashedField::Digest(hash_value(scalar)),
    }
}
