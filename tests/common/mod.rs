//! Shared fixtures: a local validator API and sealed archive builders

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use serde_json::Value;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contribution_proof::crypto::{self, KdfParams};

pub const SIGNATURE: &str = "test-signature";

/// Body size served by the oversized archive routes
pub const OVERSIZED_BYTES: usize = 256 * 1024;

/// How long the stalling route waits before answering
pub const STALL: Duration = Duration::from_secs(5);

/// Cheap parameters so sealing fixtures stays fast
pub const TEST_PARAMS: KdfParams = KdfParams {
    memory_kb: 1024,
    iterations: 1,
    parallelism: 1,
};

/// State behind the fixture server
#[derive(Clone, Default)]
pub struct Validator {
    /// Body returned by `/api/userinfo`
    pub listing: Arc<Mutex<Value>>,
    /// Archives served under `/files/:name`
    pub archives: Arc<DashMap<String, Vec<u8>>>,
    pub downloads: Arc<AtomicUsize>,
    pub validations: Arc<AtomicUsize>,
    pub reject_ownership: Arc<AtomicBool>,
}

impl Validator {
    pub fn set_listing(&self, listing: Value) {
        *self.listing.lock().unwrap() = listing;
    }

    pub fn add_archive(&self, name: &str, bytes: Vec<u8>) {
        self.archives.insert(name.to_string(), bytes);
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

async fn userinfo(State(state): State<Validator>, Json(_body): Json<Value>) -> Json<Value> {
    Json(state.listing.lock().unwrap().clone())
}

async fn datavalidation(
    State(state): State<Validator>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    state.validations.fetch_add(1, Ordering::SeqCst);

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    let well_formed = body["walletAddress"].is_string() && body["types"].is_array();

    if bearer && well_formed && !state.reject_ownership.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn archive(
    State(state): State<Validator>,
    Path(name): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    state.downloads.fetch_add(1, Ordering::SeqCst);
    state
        .archives
        .get(&name)
        .map(|bytes| bytes.clone())
        .ok_or(StatusCode::NOT_FOUND)
}

/// Serves the archive only after `STALL`
async fn slow_archive(state: State<Validator>, name: Path<String>) -> Result<Vec<u8>, StatusCode> {
    tokio::time::sleep(STALL).await;
    archive(state, name).await
}

/// Oversized body with a Content-Length header
async fn oversized(State(state): State<Validator>) -> Vec<u8> {
    state.downloads.fetch_add(1, Ordering::SeqCst);
    vec![0u8; OVERSIZED_BYTES]
}

/// Oversized body streamed in chunks, no Content-Length
async fn oversized_stream(State(state): State<Validator>) -> Body {
    state.downloads.fetch_add(1, Ordering::SeqCst);
    let chunks = (0..OVERSIZED_BYTES / 1024).map(|_| Ok::<_, std::io::Error>(vec![0u8; 1024]));
    Body::from_stream(futures::stream::iter(chunks))
}

/// Start the fixture server; returns its state and base URL
pub async fn spawn_validator() -> (Validator, String) {
    let state = Validator::default();
    state.set_listing(Value::Array(Vec::new()));

    let app = Router::new()
        .route("/api/userinfo", post(userinfo))
        .route("/api/datavalidation", post(datavalidation))
        .route("/files/:name", get(archive))
        .route("/slow/:name", get(slow_archive))
        .route("/oversized", get(oversized))
        .route("/oversized-stream", get(oversized_stream))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, format!("http://{addr}"))
}

/// Seal a JSON document the way producers upload it
pub fn sealed_json(document: &Value) -> Vec<u8> {
    crypto::seal(&serde_json::to_vec(document).unwrap(), SIGNATURE.as_bytes(), TEST_PARAMS).unwrap()
}

/// Seal a zip holding `document` at `entry_name`
pub fn sealed_zip(entry_name: &str, document: &Value) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(entry_name, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(&serde_json::to_vec(document).unwrap())
        .unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    crypto::seal(&bytes, SIGNATURE.as_bytes(), TEST_PARAMS).unwrap()
}
