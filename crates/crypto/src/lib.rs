//! Authenticated encryption for per-tenant delivery credentials.
//!
//! Secret fields (SMTP username/password, SMS account id and auth token) are
//! stored as opaque ciphertext bytes: a fresh random 12-byte nonce prepended
//! to the AES-256-GCM sealed output. Any tampering fails decryption loudly.
//!
//! Decrypted values are returned as [`SecretString`] to prevent accidental
//! logging. The [`MasterKey`] wrapper zeroizes key material on drop and is
//! held for the process lifetime only -- it is never persisted.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// Re-export for consumers so they don't need a direct `secrecy` dependency.
pub use secrecy::{ExposeSecret, SecretString};

/// Size of the nonce prepended to every ciphertext.
pub const NONCE_LEN: usize = 12;

/// A 32-byte AES-256 master key that is zeroized when dropped.
///
/// The [`Debug`] implementation is redacted to avoid accidental logging.
/// Raw bytes are not accessible outside this crate -- all cryptographic
/// operations go through [`SecretVault`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The master key does not decode to exactly 32 bytes of hex.
    #[error("invalid key length")]
    InvalidKeyLength,

    /// The ciphertext is shorter than the prepended nonce.
    #[error("ciphertext too short")]
    CiphertextTooShort,

    /// The authenticator rejected the ciphertext -- wrong key or tampering.
    #[error("decryption failed (wrong key or corrupted data)")]
    DecryptionFailed,

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The decrypted plaintext is not valid UTF-8.
    #[error("decrypted value is not UTF-8")]
    NotUtf8,
}

/// Parse a 32-byte master key from 64 hex characters.
pub fn parse_master_key(raw: &str) -> Result<MasterKey, CryptoError> {
    let trimmed = raw.trim();
    let bytes = hex::decode(trimmed).map_err(|_| CryptoError::InvalidKeyLength)?;
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidKeyLength);
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(MasterKey(key))
}

/// Encrypts and decrypts short secret strings with AES-256-GCM.
pub struct SecretVault {
    key: MasterKey,
}

impl SecretVault {
    /// Create a vault around an already-parsed master key.
    #[must_use]
    pub fn new(key: MasterKey) -> Self {
        Self { key }
    }

    /// Create a vault directly from a hex-encoded master key.
    pub fn from_hex(raw: &str) -> Result<Self, CryptoError> {
        Ok(Self::new(parse_master_key(raw)?))
    }

    /// Encrypt a plaintext secret, producing `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|_| CryptoError::InvalidKeyLength)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt ciphertext produced by [`encrypt`](Self::encrypt).
    ///
    /// Returns a [`SecretString`] to prevent accidental logging of the
    /// decrypted secret.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretString, CryptoError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(CryptoError::CiphertextTooShort);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|_| CryptoError::InvalidKeyLength)?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        let value = String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)?;
        Ok(SecretString::new(value))
    }
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretVault([REDACTED])")
    }
}
