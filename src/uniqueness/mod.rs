//! Contribution uniqueness engine
//!
//! ```text
//! Submission ─→ normalize ─→ current ─────────────────────┐
//! wallet ─→ directory ─→ files ─→ retriever ─→ historical ─┴→ compare ─→ outcome
//!                                                  current ─→ cache (own file id)
//! ```
//!
//! - **hasher**: digests of secured leaf values
//! - **normalizer**: secured data → digests, shape preserved
//! - **payload**: decrypted archive → submission JSON
//! - **retriever**: cache-first retrieval of historical files
//! - **comparator**: per-type digest-set novelty

pub mod comparator;
pub mod hasher;
pub mod normalizer;
pub mod payload;
pub mod retriever;

pub use comparator::{compare, FieldPolicy};
pub use normalizer::normalize;
pub use retriever::{FetchError, HistoricalRetriever, RetrieverConfig};

use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::ContributionCache;
use crate::services::DirectoryClient;
use crate::types::{NormalizedContribution, Submission, UniquenessOutcome};

/// Scores a submission's novelty and records it for later runs
pub struct UniquenessEngine {
    directory: DirectoryClient,
    retriever: HistoricalRetriever,
    cache: Arc<dyn ContributionCache>,
    policy: FieldPolicy,
    current_file_id: Option<String>,
}

impl UniquenessEngine {
    pub fn new(
        directory: DirectoryClient,
        retriever: HistoricalRetriever,
        cache: Arc<dyn ContributionCache>,
        policy: FieldPolicy,
        current_file_id: Option<String>,
    ) -> Self {
        Self {
            directory,
            retriever,
            cache,
            policy,
            current_file_id,
        }
    }

    /// Uniqueness of `submission` against its submitter's history.
    ///
    /// Never fails: missing history, unreachable collaborators and broken
    /// historical files all reduce what is compared against, nothing more.
    pub async fn evaluate(&self, submission: &Submission) -> UniquenessOutcome {
        let current = normalize(&submission.contributions);

        let wallet = submission.wallet_address.as_deref().unwrap_or_default();
        let historical = self.fetch_historical(wallet).await;

        self.store(&current).await;

        let report = compare(&current, &historical, self.policy);
        info!(
            types = report.comparison_results.len(),
            historical_entries = historical.len(),
            score = report.total_normalized_score,
            policy = %self.policy,
            "Uniqueness computed"
        );
        report.into()
    }

    /// Normalized history of `wallet`, excluding the current file
    pub async fn fetch_historical(&self, wallet: &str) -> Vec<NormalizedContribution> {
        if wallet.is_empty() {
            warn!("Submission has no walletAddress, comparing against empty history");
            return Vec::new();
        }

        let mut files = self.directory.historical_files(wallet).await;
        if let Some(current) = self.current_file_id.as_deref() {
            files.retain(|f| f.file_id != current);
        }

        self.retriever.fetch_historical(&files).await
    }

    /// Record the current submission under its own file id.
    ///
    /// Failures are logged and swallowed.
    pub async fn store(&self, current: &[NormalizedContribution]) {
        let Some(file_id) = self.current_file_id.as_deref() else {
            warn!("FILE_ID not set, current submission not cached");
            return;
        };

        match self.cache.put(file_id, current).await {
            Ok(()) => info!(file_id = %file_id, backend = self.cache.backend(), "Current submission cached"),
            Err(e) => warn!(file_id = %file_id, error = %e, "Failed to cache current submission"),
        }
    }
}
