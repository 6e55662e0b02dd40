//! Cache store for normalized submissions
//!
//! Entries are keyed by file identifier and hold the JSON list of that
//! file's normalized contributions. Once written an entry is treated as
//! historical truth; a run only ever writes its own file identifier.
//!
//! The store is a capability chosen once at startup:
//!
//! - **RedisCache**: the shared store, batched reads in one pipeline
//! - **InMemoryCache**: process-local, same encoding (tests, single runs)
//! - **NoopCache**: store unavailable; every read misses, writes are dropped

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::types::{NormalizedContribution, Result};

pub use self::memory::InMemoryCache;
pub use self::redis_store::RedisCache;

/// Connection settings for the cache store
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store host; `None` selects the no-op cache
    pub host: Option<String>,
    pub port: u16,
    pub password: Option<String>,
    /// Bound on every round trip, including connect
    pub timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 6379,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Keyed store of normalized submissions
#[async_trait]
pub trait ContributionCache: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Look up many entries in one round trip.
    ///
    /// The result is positionally aligned with `file_ids`. Entries that are
    /// absent or cannot be decoded come back as `None`.
    async fn get_many(&self, file_ids: &[String]) -> Result<Vec<Option<Vec<NormalizedContribution>>>>;

    /// Store an entry under `file_id`
    async fn put(&self, file_id: &str, entries: &[NormalizedContribution]) -> Result<()>;
}

/// Cache used when no store is reachable
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl ContributionCache for NoopCache {
    fn backend(&self) -> &'static str {
        "none"
    }

    async fn get_many(&self, file_ids: &[String]) -> Result<Vec<Option<Vec<NormalizedContribution>>>> {
        Ok(vec![None; file_ids.len()])
    }

    async fn put(&self, _file_id: &str, _entries: &[NormalizedContribution]) -> Result<()> {
        Ok(())
    }
}

/// Select the cache backend for this process.
///
/// Never fails: an unset host or an unreachable store degrades to
/// [`NoopCache`] so every historical file goes through download.
pub async fn connect(config: &CacheConfig) -> Arc<dyn ContributionCache> {
    let Some(host) = config.host.as_deref().filter(|h| !h.is_empty()) else {
        info!("No cache host configured, running without cache");
        return Arc::new(NoopCache);
    };

    match RedisCache::connect(host, config.port, config.password.as_deref(), config.timeout).await {
        Ok(cache) => {
            info!(host = %host, port = config.port, "Cache store connected");
            Arc::new(cache)
        }
        Err(e) => {
            warn!(host = %host, port = config.port, error = %e, "Cache store unreachable, running without cache");
            Arc::new(NoopCache)
        }
    }
}

/// Serialize an entry the way every backend stores it
pub fn encode_entry(entries: &[NormalizedContribution]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}

/// Decode a stored entry; undecodable entries are treated as misses
pub fn decode_entry(file_id: &str, raw: &str) -> Option<Vec<NormalizedContribution>> {
    match serde_json::from_str(raw) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!(file_id = %file_id, error = %e, "Ignoring undecodable cache entry");
            None
        }
    }
}
