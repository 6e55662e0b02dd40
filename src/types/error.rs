//! Error types for the contribution proof

/// Main error type for proof operations
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

// From conversions for the crates at the edges

impl From<reqwest::Error> for ProofError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<redis::RedisError> for ProofError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<zip::result::ZipError> for ProofError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ProofError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(format!("JWT error: {}", err))
    }
}

/// Result type alias for proof operations
pub type Result<T> = std::result::Result<T, ProofError>;
