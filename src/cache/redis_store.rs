//! Redis-backed cache store

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::{decode_entry, encode_entry, ContributionCache};
use crate::types::{NormalizedContribution, ProofError, Result};

/// Shared cache store on Redis (database 0)
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
    timeout: Duration,
}

impl RedisCache {
    /// Connect and verify the store answers `PING`
    pub async fn connect(
        host: &str,
        port: u16,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = redis::Client::open(connection_url(host, port, password))?;
        let mut conn = bounded(timeout, client.get_multiplexed_async_connection()).await?;

        let pong: String = bounded(timeout, redis::cmd("PING").query_async(&mut conn)).await?;
        debug!(reply = %pong, "Cache store answered ping");

        Ok(Self { conn, timeout })
    }
}

#[async_trait]
impl ContributionCache for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get_many(&self, file_ids: &[String]) -> Result<Vec<Option<Vec<NormalizedContribution>>>> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for file_id in file_ids {
            pipe.get(file_id);
        }

        let mut conn = self.conn.clone();
        let raw: Vec<Option<String>> = bounded(self.timeout, pipe.query_async(&mut conn)).await?;

        if raw.len() != file_ids.len() {
            return Err(ProofError::Cache(format!(
                "pipeline returned {} replies for {} keys",
                raw.len(),
                file_ids.len()
            )));
        }

        Ok(file_ids
            .iter()
            .zip(raw)
            .map(|(file_id, value)| value.and_then(|v| decode_entry(file_id, &v)))
            .collect())
    }

    async fn put(&self, file_id: &str, entries: &[NormalizedContribution]) -> Result<()> {
        let payload = encode_entry(entries)?;
        let mut conn = self.conn.clone();
        bounded(self.timeout, conn.set::<_, _, ()>(file_id, payload)).await
    }
}

/// Run a cache round trip under the configured timeout
async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(ProofError::from),
        Err(_) => Err(ProofError::Cache(format!(
            "cache round trip timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

fn connection_url(host: &str, port: u16, password: Option<&str>) -> String {
    match password.filter(|p| !p.is_empty()) {
        Some(pwd) => format!("redis://:{}@{}:{}/0", urlencoding::encode(pwd), host, port),
        None => format!("redis://{}:{}/0", host, port),
    }
}
