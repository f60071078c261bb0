//! Token vault: encryption at rest for provider access and refresh tokens.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

use crate::error::{FederationError, FederationResult};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// AES-256-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;

/// AES-256-GCM token vault.
///
/// Stored form: `base64(nonce (12 bytes) || ciphertext || tag)`.
#[derive(Clone)]
pub struct TokenVault {
    cipher: Aes256Gcm,
}

impl fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

impl TokenVault {
    /// Create a vault from raw key bytes. The key must be exactly 32 bytes.
    pub fn new(key: &[u8]) -> FederationResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(FederationError::InvalidKeyLength(key.len()));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| FederationError::EncryptionFailed(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Encrypt a token. Every call draws a fresh nonce, so equal inputs
    /// produce different outputs.
    pub fn encrypt(&self, plaintext: &str) -> FederationResult<String> {
        // SECURITY: Use OsRng (CSPRNG) for nonce generation
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| FederationError::EncryptionFailed(e.to_string()))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(result))
    }

    /// Decrypt a token produced by [`TokenVault::encrypt`].
    pub fn decrypt(&self, encrypted: &str) -> FederationResult<String> {
        let raw = BASE64
            .decode(encrypted)
            .map_err(|e| FederationError::DecryptionFailed(format!("invalid base64: {e}")))?;

        if raw.len() < NONCE_SIZE {
            return Err(FederationError::CiphertextTruncated);
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        // A tampered ciphertext or a wrong key fails the GCM tag check.
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| FederationError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|e| FederationError::DecryptionFailed(e.to_string()))
    }
}
