//! Contribution proof - scoring for a decentralized data pool
//!
//! Scores a submitted data-contribution file on four dimensions and
//! combines them into one acceptance score.
//!
//! ## Dimensions
//!
//! - **Ownership**: the validator confirms the wallet owns the declared sources
//! - **Authenticity**: contributions carry a trusted witness
//! - **Uniqueness**: secured data not seen in the submitter's earlier files
//! - **Quality**: per-source points scaled by uniqueness
//!
//! The uniqueness engine is the core: it hashes disclosed fields, pulls the
//! submitter's history from a cache or by downloading and decrypting prior
//! archives, and compares digest sets per contribution type.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod proof;
pub mod scoring;
pub mod services;
pub mod types;
pub mod uniqueness;

pub use config::Args;
pub use proof::{run, Proof, ProofResponse};
pub use types::{ProofError, Result};
