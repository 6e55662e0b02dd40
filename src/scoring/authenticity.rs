//! Authenticity: were the contributions witnessed by a trusted attestor?

use serde_json::Value;

use crate::types::Contribution;

/// Witness endpoints accepted as proof of provenance
pub const VALID_WITNESS_DOMAINS: &[&str] =
    &["wss://witness.reclaimprotocol.org/ws", "reclaimprotocol.org"];

/// Fraction of contributions carrying a recognized witness; 0 when empty
pub fn authenticity_score(contributions: &[Contribution]) -> f64 {
    if contributions.is_empty() {
        return 0.0;
    }

    let witnessed = contributions
        .iter()
        .filter(|c| c.witnesses.as_ref().is_some_and(is_witnessed))
        .count();

    witnessed as f64 / contributions.len() as f64
}

/// A string witness passes when it contains a valid domain; a list passes
/// only when one of its entries is exactly a valid domain.
fn is_witnessed(witnesses: &Value) -> bool {
    match witnesses {
        Value::String(url) => mentions_valid_domain(url),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|item| VALID_WITNESS_DOMAINS.contains(&item)),
        _ => false,
    }
}

fn mentions_valid_domain(url: &str) -> bool {
    VALID_WITNESS_DOMAINS.iter().any(|domain| url.contains(domain))
}
