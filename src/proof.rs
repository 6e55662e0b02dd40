//! Proof runner: score every submission in the input directory
//!
//! Input bundles (zip files) are unpacked in place first, then each JSON
//! submission, in name order, is scored on all four dimensions. The
//! response reflects the last submission scored; `valid` drops to false as
//! soon as any submission fails authenticity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cache;
use crate::config::Args;
use crate::scoring::{self, TypeScore};
use crate::services::{self, DirectoryClient, OwnershipVerifier};
use crate::types::{ProofError, Result, Submission, UniqueEntry};
use crate::uniqueness::{HistoricalRetriever, UniquenessEngine};

/// Name of the file the response is written to
pub const RESULTS_FILE: &str = "results.json";

/// Per-type detail reported next to the scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProofAttributes {
    pub unique_entries: Vec<UniqueEntry>,
    pub type_scores: BTreeMap<String, TypeScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofResponse {
    pub dlp_id: u32,
    pub valid: bool,
    pub score: f64,
    pub ownership: f64,
    pub uniqueness: f64,
    pub quality: f64,
    pub authenticity: f64,
    pub attributes: ProofAttributes,
}

impl ProofResponse {
    fn new(dlp_id: u32) -> Self {
        Self {
            dlp_id,
            valid: true,
            score: 0.0,
            ownership: 0.0,
            uniqueness: 0.0,
            quality: 0.0,
            authenticity: 0.0,
            attributes: ProofAttributes::default(),
        }
    }
}

/// Scores submissions with shared collaborators
pub struct Proof {
    dlp_id: u32,
    ownership: OwnershipVerifier,
    uniqueness: UniquenessEngine,
}

impl Proof {
    pub fn new(dlp_id: u32, ownership: OwnershipVerifier, uniqueness: UniquenessEngine) -> Self {
        Self {
            dlp_id,
            ownership,
            uniqueness,
        }
    }

    /// Score one submission into `response`
    pub async fn score_submission(
        &self,
        submission: &Submission,
        response: &mut ProofResponse,
    ) -> Result<()> {
        let wallet = submission.wallet_address.as_deref().unwrap_or_default();
        response.ownership = self.ownership.score(wallet, &submission.types()).await?;

        let outcome = self.uniqueness.evaluate(submission).await;
        response.uniqueness = outcome.uniqueness_score;

        let quality = scoring::quality_score(&submission.contributions, &outcome.unique_entries);
        response.quality = quality.quality_score;

        response.authenticity = scoring::authenticity_score(&submission.contributions);
        if response.authenticity < 1.0 {
            response.valid = false;
        }

        response.score = scoring::final_score(
            response.authenticity,
            response.ownership,
            response.uniqueness,
            response.quality,
        );
        response.attributes = ProofAttributes {
            unique_entries: outcome.unique_entries,
            type_scores: quality.type_scores,
        };
        Ok(())
    }

    /// Score every `.json` file directly under `input_dir`
    pub async fn generate(&self, input_dir: &Path) -> Result<ProofResponse> {
        let inputs = json_inputs(input_dir)?;
        if inputs.is_empty() {
            return Err(ProofError::InvalidInput(format!(
                "no JSON submission found in {}",
                input_dir.display()
            )));
        }

        let mut response = ProofResponse::new(self.dlp_id);
        for path in inputs {
            info!(file = %path.display(), "Processing submission");
            let raw = tokio::fs::read(&path).await?;
            let submission: Submission = serde_json::from_slice(&raw).map_err(|e| {
                ProofError::InvalidInput(format!("{} is not a submission: {e}", path.display()))
            })?;
            self.score_submission(&submission, &mut response).await?;
        }

        info!(
            valid = response.valid,
            score = response.score,
            ownership = response.ownership,
            uniqueness = response.uniqueness,
            quality = response.quality,
            authenticity = response.authenticity,
            "Proof generated"
        );
        Ok(response)
    }
}

/// `.json` files directly under `dir`, sorted by name
fn json_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn is_zip(path: &Path) -> io::Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = fs::File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == b"PK\x03\x04" || &magic == b"PK\x05\x06"),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Unpack every zip in `input_dir` into it.
///
/// Entries whose names would escape the directory are skipped. Returns the
/// number of files written.
pub fn extract_input(input_dir: &Path) -> Result<usize> {
    let mut written = 0;

    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_zip(&path)? {
            continue;
        }

        let mut archive = zip::ZipArchive::new(fs::File::open(&path)?)?;
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if !file.is_file() {
                continue;
            }
            let Some(relative) = file.enclosed_name() else {
                warn!(archive = %path.display(), entry = %file.name(), "Skipping unsafe zip entry");
                continue;
            };

            let target = input_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&target)?;
            io::copy(&mut file, &mut out)?;
            written += 1;
        }
        info!(archive = %path.display(), "Extracted input bundle");
    }

    Ok(written)
}

/// Run a full proof from configuration and write the results file
pub async fn run(args: &Args) -> Result<ProofResponse> {
    let input_dir = args.input_dir();
    let output_dir = args.output_dir();

    let has_inputs = input_dir.is_dir() && fs::read_dir(&input_dir)?.next().is_some();
    if !has_inputs {
        return Err(ProofError::InvalidInput(format!(
            "No input files found in {}",
            input_dir.display()
        )));
    }
    extract_input(&input_dir)?;

    let ownership_config = args.ownership_config()?;
    let http = services::http_client(args.request_timeout())?;
    let cache = cache::connect(&args.cache_config()).await;

    let directory = DirectoryClient::new(ownership_config.validator_base_url.clone(), http.clone());
    let retriever = HistoricalRetriever::new(http.clone(), cache.clone(), args.retriever_config());
    let engine = UniquenessEngine::new(
        directory,
        retriever,
        cache,
        args.field_policy,
        args.file_id.clone(),
    );
    let proof = Proof::new(args.dlp_id, OwnershipVerifier::new(ownership_config, http), engine);

    let response = proof.generate(&input_dir).await?;

    fs::create_dir_all(&output_dir)?;
    let output_path = output_dir.join(RESULTS_FILE);
    fs::write(&output_path, serde_json::to_vec_pretty(&response)?)?;
    info!(path = %output_path.display(), "Results written");

    Ok(response)
}
