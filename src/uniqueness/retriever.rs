//! Historical retrieval: cache first, download and decrypt on a miss
//!
//! The cache is consulted once for every file in a single batched call.
//! Misses are fetched concurrently, bounded by a semaphore, each under its
//! own timeout. A file that fails at any stage is skipped with a warning;
//! retrieval itself never fails.

use futures::future::join_all;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::normalizer::normalize;
use super::payload::{self, FetchStage};
use crate::cache::ContributionCache;
use crate::crypto;
use crate::types::{HistoricalFile, NormalizedContribution, ProofError, Result};

/// Settings for historical retrieval
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Passphrase the historical archives are sealed with
    pub signature: Option<String>,
    /// Parent of the per-file scratch directories
    pub download_dir: PathBuf,
    pub max_concurrent_downloads: usize,
    /// Bound on download, decryption and parsing of one file
    pub file_timeout: Duration,
    /// Cap on both the downloaded archive and the JSON unpacked from it
    pub max_download_bytes: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            signature: None,
            download_dir: std::env::temp_dir(),
            max_concurrent_downloads: 4,
            file_timeout: Duration::from_secs(120),
            max_download_bytes: 512 * 1024 * 1024,
        }
    }
}

/// A historical file that could not be retrieved
#[derive(Debug, thiserror::Error)]
#[error("failed while {stage}: {source}")]
pub struct FetchError {
    /// Last stage reached before the failure
    pub stage: FetchStage,
    #[source]
    pub source: ProofError,
}

/// Stage tracking for one file on the download path
struct Progress<'a> {
    file_id: &'a str,
    stage: FetchStage,
}

impl<'a> Progress<'a> {
    fn new(file_id: &'a str) -> Self {
        Self {
            file_id,
            stage: FetchStage::Pending,
        }
    }

    fn advance(&mut self, next: FetchStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        debug!(file_id = %self.file_id, from = %self.stage, to = %next, "Historical file stage");
        self.stage = next;
    }

    fn fail(&self, source: ProofError) -> FetchError {
        FetchError {
            stage: self.stage,
            source,
        }
    }
}

/// Assembles the normalized contributions of a submitter's prior files
pub struct HistoricalRetriever {
    http: reqwest::Client,
    cache: Arc<dyn ContributionCache>,
    config: RetrieverConfig,
}

impl HistoricalRetriever {
    pub fn new(
        http: reqwest::Client,
        cache: Arc<dyn ContributionCache>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            http,
            cache,
            config,
        }
    }

    /// Normalized contributions of every retrievable file, in listing order.
    ///
    /// Cache hits and downloads are interleaved back into the order of
    /// `files`, so the result does not depend on which path served a file
    /// or on download completion order.
    pub async fn fetch_historical(&self, files: &[HistoricalFile]) -> Vec<NormalizedContribution> {
        if files.is_empty() {
            return Vec::new();
        }

        let file_ids: Vec<String> = files.iter().map(|f| f.file_id.clone()).collect();
        let cached = match self.cache.get_many(&file_ids).await {
            Ok(cached) if cached.len() == files.len() => cached,
            Ok(cached) => {
                warn!(
                    backend = self.cache.backend(),
                    expected = files.len(),
                    got = cached.len(),
                    "Cache returned a misaligned batch, treating all as misses"
                );
                vec![None; files.len()]
            }
            Err(e) => {
                warn!(backend = self.cache.backend(), error = %e, "Cache lookup failed, treating all as misses");
                vec![None; files.len()]
            }
        };

        let hits = cached.iter().filter(|entry| entry.is_some()).count();
        let semaphore = Semaphore::new(self.config.max_concurrent_downloads.max(1));
        let semaphore = &semaphore;

        let fetches = files.iter().zip(cached).map(|(file, hit)| async move {
            if let Some(entries) = hit {
                debug!(file_id = %file.file_id, "Historical file served from cache");
                return Some(entries);
            }

            let _permit = semaphore.acquire().await.ok()?;
            match tokio::time::timeout(self.config.file_timeout, self.fetch_one(file)).await {
                Ok(Ok(entries)) => Some(entries),
                Ok(Err(e)) => {
                    warn!(file_id = %file.file_id, stage = %e.stage, error = %e.source, "Skipping historical file");
                    None
                }
                Err(_) => {
                    warn!(
                        file_id = %file.file_id,
                        timeout_secs = self.config.file_timeout.as_secs(),
                        "Skipping historical file: timed out"
                    );
                    None
                }
            }
        });

        let outcomes = join_all(fetches).await;
        let retrieved = outcomes.iter().filter(|o| o.is_some()).count();

        info!(
            files = files.len(),
            cache_hits = hits,
            downloaded = retrieved - hits,
            skipped = files.len() - retrieved,
            "Historical retrieval complete"
        );

        outcomes.into_iter().flatten().flatten().collect()
    }

    /// Download path for one cache miss
    async fn fetch_one(
        &self,
        file: &HistoricalFile,
    ) -> std::result::Result<Vec<NormalizedContribution>, FetchError> {
        let mut progress = Progress::new(&file.file_id);
        progress.advance(FetchStage::CacheMiss);

        let url = file
            .file_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| progress.fail(ProofError::InvalidInput("no fileUrl".into())))?;
        let signature = self
            .config
            .signature
            .clone()
            .ok_or_else(|| progress.fail(ProofError::Config("SIGNATURE is not set".into())))?;

        // Removed on drop, whichever way this function returns.
        let scratch = tempfile::Builder::new()
            .prefix("historical-")
            .tempdir_in(&self.config.download_dir)
            .map_err(|e| progress.fail(e.into()))?;
        let archive_path = scratch.path().join("archive.enc");

        progress.advance(FetchStage::Downloading);
        let size = self
            .download(url, &archive_path)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.advance(FetchStage::Downloaded);
        debug!(file_id = %file.file_id, bytes = size, "Historical archive downloaded");

        let sealed = tokio::fs::read(&archive_path)
            .await
            .map_err(|e| progress.fail(e.into()))?;

        progress.advance(FetchStage::Decrypting);
        let decrypted =
            tokio::task::spawn_blocking(move || crypto::open(&sealed, signature.as_bytes()))
                .await
                .map_err(|e| progress.fail(ProofError::Internal(format!("decrypt task: {e}"))))?
                .map_err(|e| progress.fail(e))?;
        progress.advance(FetchStage::Decrypted);

        let json = payload::extract(payload::classify(decrypted), self.config.max_download_bytes)
            .map_err(|e| progress.fail(e))?;
        progress.advance(FetchStage::Extracted);

        let contributions = payload::parse_contributions(&json).map_err(|e| progress.fail(e))?;
        progress.advance(FetchStage::Parsed);

        let normalized = normalize(&contributions);
        progress.advance(FetchStage::Done);
        Ok(normalized)
    }

    /// Stream `url` into `dest`, enforcing the size cap
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let limit = self.config.max_download_bytes;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProofError::Upstream {
                status: status.as_u16(),
                message: format!("archive download from {url}"),
            });
        }
        if let Some(length) = response.content_length() {
            if length > limit {
                return Err(ProofError::MalformedPayload(format!(
                    "archive is {length} bytes, limit is {limit}"
                )));
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > limit {
                return Err(ProofError::MalformedPayload(format!(
                    "archive exceeds {limit} bytes"
                )));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }
}
