//! Process-local cache store

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{decode_entry, encode_entry, ContributionCache};
use crate::types::{NormalizedContribution, Result};

/// In-memory cache with the same entry encoding as the shared store
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, String>,
    batch_reads: AtomicUsize,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw (already encoded) entry
    pub fn insert_raw(&self, file_id: impl Into<String>, raw: impl Into<String>) {
        self.entries.insert(file_id.into(), raw.into());
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.entries.contains_key(file_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `get_many` round trips served
    pub fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ContributionCache for InMemoryCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_many(&self, file_ids: &[String]) -> Result<Vec<Option<Vec<NormalizedContribution>>>> {
        self.batch_reads.fetch_add(1, Ordering::Relaxed);
        Ok(file_ids
            .iter()
            .map(|file_id| {
                self.entries
                    .get(file_id)
                    .and_then(|raw| decode_entry(file_id, raw.value()))
            })
            .collect())
    }

    async fn put(&self, file_id: &str, entries: &[NormalizedContribution]) -> Result<()> {
        self.entries.insert(file_id.to_string(), encode_entry(entries)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HashedField;

    fn entry(kind: &str, digest: &str) -> Vec<NormalizedContribution> {
        vec![NormalizedContribution {
            contribution_type: kind.into(),
            secured_shared_data: [("k".to_string(), HashedField::Digest(digest.into()))]
                .into_iter()
                .collect(),
        }]
    }

    #[tokio::test]
    async fn test_put_then_batch_get() {
        let cache = InMemoryCache::new();
        cache.put("f1", &entry("GITHUB", "d1")).await.unwrap();
        cache.put("f3", &entry("REDDIT", "d3")).await.unwrap();

        let ids: Vec<String> = ["f1", "f2", "f3"].iter().map(|s| s.to_string()).collect();
        let got = cache.get_many(&ids).await.unwrap();

        assert_eq!(got, vec![Some(entry("GITHUB", "d1")), None, Some(entry("REDDIT", "d3"))]);
        assert_eq!(cache.batch_reads(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_raw_entry_misses() {
        let cache = InMemoryCache::new();
        cache.insert_raw("f1", "{broken");

        let got = cache.get_many(&["f1".to_string()]).await.unwrap();
        assert_eq!(got, vec![None]);
        assert!(cache.contains("f1"));
    }
}
