//! HTTP collaborators on the validator API
//!
//! - **Directory**: submitter → historical file references
//! - **Ownership**: token-authenticated data validation

pub mod directory;
pub mod ownership;

pub use directory::DirectoryClient;
pub use ownership::{OwnershipConfig, OwnershipVerifier};

use std::time::Duration;

use crate::types::Result;

/// User agent sent on every outbound request
pub const USER_AGENT: &str = concat!("contribution-proof/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by every collaborator
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Join a base URL and an absolute endpoint path
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
