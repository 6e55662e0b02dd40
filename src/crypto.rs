//! Passphrase envelope for historical submission archives.
//!
//! # Algorithms
//!
//! - **Key Derivation**: Argon2id (memory-hard, brute-force resistant)
//! - **Encryption**: ChaCha20-Poly1305 (authenticated encryption)
//!
//! # Envelope layout
//!
//! ```text
//! "CPE1" | m_cost u32be | t_cost u32be | p_cost u32be | salt (16) | nonce (12) | ciphertext+tag
//! ```
//!
//! The Argon2 parameters travel with the envelope so producers can tune cost
//! without coordinating with every validator. They are untrusted on the way
//! in and are bounded before any key derivation happens.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::types::{ProofError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Envelope magic and format version
pub const MAGIC: &[u8; 4] = b"CPE1";

/// Salt length for key derivation (16 bytes)
pub const SALT_LEN: usize = 16;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

/// Header length: magic + three u32 parameters + salt + nonce
pub const HEADER_LEN: usize = MAGIC.len() + 12 + SALT_LEN + NONCE_LEN;

/// Largest Argon2 memory cost accepted from an envelope header (256 MB)
pub const MAX_MEMORY_KB: u32 = 262_144;

/// Largest Argon2 iteration count accepted from an envelope header
pub const MAX_ITERATIONS: u32 = 16;

/// Largest Argon2 lane count accepted from an envelope header
pub const MAX_PARALLELISM: u32 = 16;

// =============================================================================
// Key Derivation
// =============================================================================

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kb: u32,
    /// Iteration count
    pub iterations: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MB, 3 iterations, 4 lanes
    fn default() -> Self {
        Self {
            memory_kb: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    fn check_bounds(&self) -> Result<()> {
        if self.memory_kb > MAX_MEMORY_KB
            || self.iterations > MAX_ITERATIONS
            || self.parallelism > MAX_PARALLELISM
        {
            return Err(ProofError::Decryption(format!(
                "Argon2 parameters out of bounds: m={} t={} p={}",
                self.memory_kb, self.iterations, self.parallelism
            )));
        }
        Ok(())
    }
}

/// Derive a 256-bit key from a passphrase using Argon2id.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>> {
    params.check_bounds()?;

    let argon_params = Params::new(
        params.memory_kb,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| ProofError::Decryption(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, &mut key[..])
        .map_err(|e| ProofError::Decryption(format!("Key derivation failed: {e}")))?;

    Ok(key)
}

// =============================================================================
// Seal / Open
// =============================================================================

/// Encrypt `plaintext` under `passphrase`, producing a self-describing envelope.
pub fn seal(plaintext: &[u8], passphrase: &[u8], params: KdfParams) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt, params)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| ProofError::Internal(format!("Encryption failed: {e}")))?;

    let mut envelope = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    envelope.extend_from_slice(MAGIC);
    envelope.extend_from_slice(&params.memory_kb.to_be_bytes());
    envelope.extend_from_slice(&params.iterations.to_be_bytes());
    envelope.extend_from_slice(&params.parallelism.to_be_bytes());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Decrypt an envelope produced by [`seal`].
///
/// # Errors
///
/// Returns [`ProofError::Decryption`] if:
/// - The input is too short or does not start with the magic
/// - The embedded Argon2 parameters exceed the accepted bounds
/// - The ciphertext is tampered or the passphrase is wrong
pub fn open(envelope: &[u8], passphrase: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < HEADER_LEN + AUTH_TAG_LEN {
        return Err(ProofError::Decryption(format!(
            "envelope too short: {} bytes",
            envelope.len()
        )));
    }
    if &envelope[..MAGIC.len()] != MAGIC {
        return Err(ProofError::Decryption("unrecognized envelope format".into()));
    }

    let read_u32 = |offset: usize| {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&envelope[offset..offset + 4]);
        u32::from_be_bytes(buf)
    };
    let params = KdfParams {
        memory_kb: read_u32(4),
        iterations: read_u32(8),
        parallelism: read_u32(12),
    };

    let salt_start = MAGIC.len() + 12;
    let nonce_start = salt_start + SALT_LEN;
    let salt = &envelope[salt_start..nonce_start];
    let nonce = &envelope[nonce_start..HEADER_LEN];
    let ciphertext = &envelope[HEADER_LEN..];

    let key = derive_key(passphrase, salt, params)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| ProofError::Decryption("authentication failed (wrong passphrase?)".into()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so tests stay fast
    const TEST_PARAMS: KdfParams = KdfParams {
        memory_kb: 1024,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn test_key_derivation() {
        let salt = [7u8; SALT_LEN];

        let key1 = derive_key(b"passphrase", &salt, TEST_PARAMS).unwrap();
        let key2 = derive_key(b"passphrase", &salt, TEST_PARAMS).unwrap();
        assert_eq!(*key1, *key2);

        let key3 = derive_key(b"passphrase", &[8u8; SALT_LEN], TEST_PARAMS).unwrap();
        assert_ne!(*key1, *key3);
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let plaintext = br#"{"contribution":[]}"#;
        let envelope = seal(plaintext, b"sig-0x01", TEST_PARAMS).unwrap();

        assert_eq!(&envelope[..4], MAGIC);
        assert_eq!(envelope.len(), HEADER_LEN + plaintext.len() + AUTH_TAG_LEN);
        assert_eq!(open(&envelope, b"sig-0x01").unwrap(), plaintext);
    }

    #[test]
    fn test_open_wrong_passphrase_fails() {
        let envelope = seal(b"secret", b"right", TEST_PARAMS).unwrap();
        let err = open(&envelope, b"wrong").unwrap_err();
        assert!(matches!(err, ProofError::Decryption(_)));
    }

    #[test]
    fn test_open_tampered_fails() {
        let mut envelope = seal(b"secret", b"right", TEST_PARAMS).unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xff;
        assert!(open(&envelope, b"right").is_err());
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(open(b"short", b"x").is_err());

        let mut not_ours = vec![0u8; HEADER_LEN + AUTH_TAG_LEN + 4];
        not_ours[..4].copy_from_slice(b"PK\x03\x04");
        assert!(open(&not_ours, b"x").is_err());
    }

    #[test]
    fn test_open_rejects_oversized_params() {
        let mut envelope = seal(b"secret", b"right", TEST_PARAMS).unwrap();
        envelope[4..8].copy_from_slice(&(MAX_MEMORY_KB + 1).to_be_bytes());

        let err = open(&envelope, b"right").unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }
}
