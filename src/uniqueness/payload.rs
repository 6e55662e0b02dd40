//! Decoding of downloaded historical archives
//!
//! Each historical file walks a fixed sequence of stages. Every transition
//! is a plain function over bytes so it can be exercised with fixtures; the
//! retriever drives them and records the stage reached when a file is
//! skipped.
//!
//! ```text
//! Pending ─┬─ CacheHit ───────────────────────────────────────────────┐
//!          └─ CacheMiss → Downloading → Downloaded → Decrypting       │
//!                          → Decrypted → Extracted → Parsed ──────────┴→ Done
//!          (any stage) → Skipped
//! ```

use std::fmt;
use std::io::{Cursor, Read};

use crate::types::{Contribution, ProofError, Result, Submission};

/// Where a historical file is in its retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Pending,
    CacheHit,
    CacheMiss,
    Downloading,
    Downloaded,
    Decrypting,
    Decrypted,
    Extracted,
    Parsed,
    Done,
    Skipped,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::CacheHit => "cache_hit",
            Self::CacheMiss => "cache_miss",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Decrypting => "decrypting",
            Self::Decrypted => "decrypted",
            Self::Extracted => "extracted",
            Self::Parsed => "parsed",
            Self::Done => "done",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

impl FetchStage {
    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(self, next: FetchStage) -> bool {
        use FetchStage::*;
        match (self, next) {
            (Done | Skipped, _) => false,
            (_, Skipped) => true,
            (Pending, CacheHit | CacheMiss)
            | (CacheHit, Done)
            | (CacheMiss, Downloading)
            | (Downloading, Downloaded)
            | (Downloaded, Decrypting)
            | (Decrypting, Decrypted)
            | (Decrypted, Extracted)
            | (Extracted, Parsed)
            | (Parsed, Done) => true,
            _ => false,
        }
    }
}

/// What a decrypted payload turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptedPayload {
    /// A JSON document, used as-is
    Json(Vec<u8>),
    /// A zip archive that should contain a JSON document
    Archive(Vec<u8>),
}

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";

/// Decrypted → classified by content signature
pub fn classify(decrypted: Vec<u8>) -> DecryptedPayload {
    if decrypted.starts_with(ZIP_LOCAL_HEADER) || decrypted.starts_with(ZIP_EMPTY_ARCHIVE) {
        DecryptedPayload::Archive(decrypted)
    } else {
        DecryptedPayload::Json(decrypted)
    }
}

/// Decrypted → Extracted: the JSON bytes the submission lives in.
///
/// `max_bytes` bounds the decompressed size of a zipped document.
pub fn extract(payload: DecryptedPayload, max_bytes: u64) -> Result<Vec<u8>> {
    match payload {
        DecryptedPayload::Json(bytes) => Ok(bytes),
        DecryptedPayload::Archive(bytes) => extract_json_from_zip(&bytes, max_bytes),
    }
}

/// Extracted → Parsed: the contribution list of a submission document
pub fn parse_contributions(json: &[u8]) -> Result<Vec<Contribution>> {
    let submission: Submission = serde_json::from_slice(json)
        .map_err(|e| ProofError::MalformedPayload(format!("not a submission document: {e}")))?;
    Ok(submission.contributions)
}

/// Locate and read the JSON document inside a zip archive.
///
/// The shallowest `.json` entry wins, ties going to archive order.
/// Directory entries and macOS resource forks are ignored. Sizes declared
/// in the archive are untrusted; reading stops once `max_bytes` is passed.
pub fn extract_json_from_zip(bytes: &[u8], max_bytes: u64) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut best: Option<(usize, usize)> = None;
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().trim_start_matches('/');
        if name.starts_with("__MACOSX/") || !name.to_ascii_lowercase().ends_with(".json") {
            continue;
        }
        let depth = name.matches('/').count();
        if best.map_or(true, |(best_depth, _)| depth < best_depth) {
            best = Some((depth, index));
        }
    }

    let (_, index) = best.ok_or_else(|| {
        ProofError::MalformedPayload("no JSON file found inside the decrypted archive".into())
    })?;

    let mut entry = archive.by_index(index)?;
    let mut contents = Vec::new();
    (&mut entry)
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut contents)?;
    if contents.len() as u64 > max_bytes {
        return Err(ProofError::MalformedPayload(format!(
            "archived JSON exceeds {max_bytes} bytes"
        )));
    }
    Ok(contents)
}
