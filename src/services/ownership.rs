//! Ownership check against the validator's data-validation endpoint
//!
//! The submitter's wallet is asserted in a short-lived HS256 token; the
//! validator answers 200 when the wallet owns the declared contribution
//! types.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, warn};

use super::endpoint;
use crate::types::{ProofError, Result};

const DATA_VALIDATION_PATH: &str = "/api/datavalidation";

/// Payload carried in the ownership token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipClaims {
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
}

#[derive(Serialize)]
struct ValidationRequest<'a> {
    #[serde(rename = "walletAddress")]
    wallet_address: &'a str,
    types: &'a [String],
}

/// Settings for the ownership check
#[derive(Debug, Clone)]
pub struct OwnershipConfig {
    pub validator_base_url: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

/// Issues ownership tokens and asks the validator to confirm them
#[derive(Clone)]
pub struct OwnershipVerifier {
    config: OwnershipConfig,
    http: reqwest::Client,
}

impl OwnershipVerifier {
    pub fn new(config: OwnershipConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Sign a token asserting `wallet_address`
    pub fn issue_token(&self, wallet_address: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ProofError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = OwnershipClaims {
            exp: now + self.config.token_ttl_secs,
            wallet_address: wallet_address.to_string(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?)
    }

    /// 1.0 when the validator confirms ownership, 0.0 otherwise.
    ///
    /// # Errors
    ///
    /// Only malformed input is an error: an empty wallet or no types.
    /// Validator failures score 0.0.
    pub async fn score(&self, wallet_address: &str, types: &[String]) -> Result<f64> {
        if wallet_address.is_empty() || types.is_empty() {
            return Err(ProofError::InvalidInput(
                "walletAddress must be non-empty and at least one contribution type is required"
                    .into(),
            ));
        }

        let token = self.issue_token(wallet_address)?;
        let url = endpoint(&self.config.validator_base_url, DATA_VALIDATION_PATH);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&ValidationRequest {
                wallet_address,
                types,
            })
            .send()
            .await;

        match response {
            Ok(r) if r.status() == reqwest::StatusCode::OK => Ok(1.0),
            Ok(r) => {
                warn!(url = %url, status = %r.status(), "Ownership validation rejected");
                Ok(0.0)
            }
            Err(e) => {
                error!(url = %url, error = %e, "Ownership validation request failed");
                Ok(0.0)
            }
        }
    }
}
