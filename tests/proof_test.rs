//! End-to-end proof runs against a local validator API

mod common;

use clap::Parser;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

use contribution_proof::config::Args;
use contribution_proof::proof::{self, ProofResponse, RESULTS_FILE};
use contribution_proof::scoring::final_score;
use contribution_proof::ProofError;

use common::{sealed_json, spawn_validator, SIGNATURE};

const WITNESS: &str = "wss://witness.reclaimprotocol.org/ws";

fn submission(witness: &str) -> Value {
    json!({
        "walletAddress": "0xabc",
        "contribution": [
            {"type": "GITHUB", "securedSharedData": {"login": "alice", "repos": ["r1", "r2", "r3"]}, "witnesses": witness},
            {"type": "NETFLIX", "securedSharedData": {"titles": ["a", "b"]}, "witnesses": [witness]},
            {"type": "REDDIT", "securedSharedData": {"karma": 10}, "witnesses": witness}
        ]
    })
}

fn args(base: &str, input: &Path, output: &Path, scratch: &Path) -> Args {
    Args::parse_from([
        "contribution-proof",
        "--node-env",
        "production",
        "--input-dir",
        input.to_str().unwrap(),
        "--output-dir",
        output.to_str().unwrap(),
        "--validator-base-api-url",
        base,
        "--jwt-secret-key",
        "test-secret",
        "--file-id",
        "current",
        "--signature",
        SIGNATURE,
        "--redis-host",
        "",
        "--download-dir",
        scratch.to_str().unwrap(),
    ])
}

async fn validator_with_history() -> (common::Validator, String) {
    let (validator, base) = spawn_validator().await;
    validator.add_archive(
        "f1",
        sealed_json(&json!({
            "walletAddress": "0xabc",
            "contribution": [
                {"type": "GITHUB", "securedSharedData": {"login": "alice", "repos": ["r1", "r2"]}}
            ]
        })),
    );
    validator.set_listing(json!([{"fileId": 7, "fileUrl": format!("{base}/files/f1")}]));
    (validator, base)
}

#[tokio::test]
async fn test_full_run_writes_results() {
    let (validator, base) = validator_with_history().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let results_dir = output.path().join("nested");

    // Submission arrives inside a zip bundle
    let mut bundle = zip::ZipWriter::new(fs::File::create(input.path().join("upload.zip")).unwrap());
    bundle
        .start_file("submission.json", zip::write::SimpleFileOptions::default())
        .unwrap();
    bundle
        .write_all(&serde_json::to_vec(&submission(WITNESS)).unwrap())
        .unwrap();
    bundle.finish().unwrap();

    let response = proof::run(&args(&base, input.path(), &results_dir, scratch.path()))
        .await
        .unwrap();

    let written: ProofResponse =
        serde_json::from_slice(&fs::read(results_dir.join(RESULTS_FILE)).unwrap()).unwrap();
    assert_eq!(written.valid, response.valid);
    assert_eq!(written.attributes.unique_entries.len(), 3);
    assert!((written.score - response.score).abs() < 1e-12);

    assert_eq!(response.dlp_id, 24);
    assert!(response.valid);
    assert_eq!(response.ownership, 1.0);
    assert_eq!(response.authenticity, 1.0);
    assert_eq!(validator.validations.load(Ordering::SeqCst), 1);

    // GITHUB 1 of 4 new, NETFLIX and REDDIT have no history
    assert!((response.uniqueness - 0.75).abs() < 1e-9);

    // GITHUB 10 x 0.25, NETFLIX 2 unique titles -> 2.5, REDDIT 15 of 50
    assert!((response.quality - 20.0 / 50.0).abs() < 1e-9);
    assert_eq!(response.attributes.type_scores["NETFLIX"].type_points, 2.5);

    let expected = final_score(
        response.authenticity,
        response.ownership,
        response.uniqueness,
        response.quality,
    );
    assert!((response.score - expected).abs() < 1e-12);
}

#[tokio::test]
async fn test_unwitnessed_submission_is_invalid() {
    let (validator, base) = validator_with_history().await;
    validator.reject_ownership.store(true, Ordering::SeqCst);

    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    fs::write(
        input.path().join("submission.json"),
        serde_json::to_vec(&submission("https://unknown.example")).unwrap(),
    )
    .unwrap();

    let response = proof::run(&args(&base, input.path(), output.path(), scratch.path()))
        .await
        .unwrap();

    assert!(!response.valid);
    assert_eq!(response.authenticity, 0.0);
    assert_eq!(response.ownership, 0.0);
    assert!(output.path().join(RESULTS_FILE).is_file());
}

#[tokio::test]
async fn test_empty_input_dir_fails() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let err = proof::run(&args(
        "http://127.0.0.1:1",
        input.path(),
        output.path(),
        input.path(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, ProofError::InvalidInput(_)));
    assert!(!output.path().join(RESULTS_FILE).exists());
}
