//! Configuration for the contribution proof
//!
//! CLI arguments and environment variable handling using clap. Every other
//! module receives a typed config derived from [`Args`]; nothing reads the
//! process environment directly.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::services::OwnershipConfig;
use crate::types::{ProofError, Result};
use crate::uniqueness::{FieldPolicy, RetrieverConfig};

/// Contribution proof - scores a data contribution for a decentralized data pool
#[derive(Parser, Debug, Clone)]
#[command(name = "contribution-proof")]
#[command(about = "Scores data contributions for ownership, authenticity, quality and uniqueness")]
pub struct Args {
    /// Runtime environment; `development` reads and writes under ./demo
    #[arg(long, env = "NODE_ENV", default_value = "production")]
    pub node_env: String,

    /// Input directory override
    #[arg(long, env = "INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Output directory override
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Data liquidity pool id echoed in the results
    #[arg(long, env = "DLP_ID", default_value = "24")]
    pub dlp_id: u32,

    /// Validator API base URL (directory and data validation)
    #[arg(long, env = "VALIDATOR_BASE_API_URL")]
    pub validator_base_api_url: Option<String>,

    /// HS256 secret for the ownership token
    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret_key: Option<String>,

    /// Ownership token lifetime in seconds
    #[arg(long, env = "JWT_EXPIRATION_TIME", default_value = "600")]
    pub jwt_expiration_time: u64,

    /// File id of the submission being scored (its cache key)
    #[arg(long, env = "FILE_ID")]
    pub file_id: Option<String>,

    /// Passphrase the historical archives are sealed with
    #[arg(long, env = "SIGNATURE", hide_env_values = true)]
    pub signature: Option<String>,

    /// Cache store configuration
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Parent directory for per-file download scratch space
    #[arg(long, env = "DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Maximum concurrent historical downloads
    #[arg(long, env = "MAX_CONCURRENT_DOWNLOADS", default_value = "4")]
    pub max_concurrent_downloads: usize,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Bound on retrieving one historical file, in seconds
    #[arg(long, env = "FILE_TIMEOUT_SECS", default_value = "120")]
    pub file_timeout_secs: u64,

    /// Largest historical archive accepted, in bytes
    #[arg(long, env = "MAX_DOWNLOAD_BYTES", default_value = "536870912")]
    pub max_download_bytes: u64,

    /// Field keys compared for types with history (historical, union)
    #[arg(long, env = "UNIQUENESS_FIELD_POLICY", default_value = "historical")]
    pub field_policy: FieldPolicy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Cache store connection configuration
#[derive(Parser, Debug, Clone)]
pub struct CacheArgs {
    /// Cache host; unset runs without a cache
    #[arg(long, env = "REDIS_HOST")]
    pub redis_host: Option<String>,

    #[arg(long, env = "REDIS_PORT", default_value = "6379")]
    pub redis_port: u16,

    #[arg(long, env = "REDIS_PWD", hide_env_values = true)]
    pub redis_pwd: Option<String>,

    /// Bound on every cache round trip, in seconds
    #[arg(long, env = "CACHE_TIMEOUT_SECS", default_value = "30")]
    pub cache_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Args {
    pub fn is_development(&self) -> bool {
        self.node_env.eq_ignore_ascii_case("development")
    }

    /// Effective input directory
    pub fn input_dir(&self) -> PathBuf {
        self.input_dir.clone().unwrap_or_else(|| {
            if self.is_development() {
                PathBuf::from("./demo/input")
            } else {
                PathBuf::from("/input")
            }
        })
    }

    /// Effective output directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            if self.is_development() {
                PathBuf::from("./demo/output")
            } else {
                PathBuf::from("/output")
            }
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            host: self.cache.redis_host.clone().filter(|h| !h.is_empty()),
            port: self.cache.redis_port,
            password: self.cache.redis_pwd.clone().filter(|p| !p.is_empty()),
            timeout: Duration::from_secs(self.cache.cache_timeout_secs),
        }
    }

    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            signature: self.signature.clone(),
            download_dir: self.download_dir.clone().unwrap_or_else(std::env::temp_dir),
            max_concurrent_downloads: self.max_concurrent_downloads,
            file_timeout: Duration::from_secs(self.file_timeout_secs),
            max_download_bytes: self.max_download_bytes,
        }
    }

    pub fn ownership_config(&self) -> Result<OwnershipConfig> {
        let validator_base_url = self
            .validator_base_api_url
            .clone()
            .ok_or_else(|| ProofError::Config("VALIDATOR_BASE_API_URL is required".into()))?;
        let jwt_secret = self
            .jwt_secret_key
            .clone()
            .ok_or_else(|| ProofError::Config("JWT_SECRET_KEY is required".into()))?;

        Ok(OwnershipConfig {
            validator_base_url,
            jwt_secret,
            token_ttl_secs: self.jwt_expiration_time,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self
            .validator_base_api_url
            .as_deref()
            .map_or(true, str::is_empty)
        {
            return Err("VALIDATOR_BASE_API_URL is required".to_string());
        }

        if self.jwt_secret_key.as_deref().map_or(true, str::is_empty) {
            return Err("JWT_SECRET_KEY is required".to_string());
        }

        if self.max_concurrent_downloads == 0 {
            return Err("MAX_CONCURRENT_DOWNLOADS must be at least 1".to_string());
        }

        if self.max_download_bytes == 0 {
            return Err("MAX_DOWNLOAD_BYTES must be greater than 0".to_string());
        }

        if self.file_id.as_deref() == Some("") {
            return Err("FILE_ID must not be empty when set".to_string());
        }

        Ok(())
    }
}
