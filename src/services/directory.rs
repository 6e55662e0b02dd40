//! Directory lookup: which files has a submitter contributed before?

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::endpoint;
use crate::types::HistoricalFile;

const USERINFO_PATH: &str = "/api/userinfo";

#[derive(Serialize)]
struct UserInfoRequest<'a> {
    #[serde(rename = "walletAddress")]
    wallet_address: &'a str,
}

/// Client for the validator's user directory
#[derive(Clone)]
pub struct DirectoryClient {
    base_url: String,
    http: reqwest::Client,
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Historical files for `wallet_address`.
    ///
    /// Any failure (transport, non-success status, unexpected body) yields an
    /// empty list: missing history is scored as novelty, not as an error.
    pub async fn historical_files(&self, wallet_address: &str) -> Vec<HistoricalFile> {
        let url = endpoint(&self.base_url, USERINFO_PATH);

        let response = match self
            .http
            .post(&url)
            .json(&UserInfoRequest { wallet_address })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Directory lookup failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "Directory lookup returned non-success");
            return Vec::new();
        }

        match response.json::<Vec<Value>>().await {
            Ok(records) => {
                let files = parse_records(records);
                debug!(count = files.len(), "Directory returned historical files");
                files
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Directory response was not a file list");
                Vec::new()
            }
        }
    }
}

/// Decode listing records one by one; a bad record drops only itself
fn parse_records(records: Vec<Value>) -> Vec<HistoricalFile> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed directory record");
                None
            }
        })
        .collect()
}
