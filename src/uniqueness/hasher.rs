//! Content hashing for secured field values
//!
//! Strings hash their UTF-8 bytes directly. Everything else is first
//! rendered as RFC 8785 canonical JSON (sorted keys, no whitespace) and the
//! rendering is hashed, so equal logical values always produce equal digests
//! regardless of key order in the source document.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 of a string's UTF-8 bytes, lowercase hex
pub fn hash_str(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Digest of any JSON value
pub fn hash_value(value: &Value) -> String {
    match value {
        Value::String(s) => hash_str(s),
        other => hash_str(&canonicalize(other)),
    }
}

/// RFC 8785 canonical rendering of a JSON value
pub fn canonicalize(value: &Value) -> String {
    // serde_json::Value cannot hold NaN or infinities, the only inputs JCS rejects
    let bytes = serde_json_canonicalizer::to_vec(value)
        .expect("serde_json::Value is always JCS-serializable");
    // JCS output is UTF-8
    String::from_utf8_lossy(&bytes).into_owned()
}
