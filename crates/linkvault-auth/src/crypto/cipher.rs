//! Argon2id key derivation and AES-256-GCM sealing.
//!
//! Every call to [`encrypt`] draws a fresh salt and nonce, so no two records
//! share key material even when they share a password. The GCM tag is split
//! off the ciphertext so the envelope can store it in its own field.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;

use super::error::CryptoError;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;
/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-GCM tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Output of [`encrypt`]; every part must be persisted to decrypt later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    /// Encrypted bytes without the tag.
    pub ciphertext: Vec<u8>,
    /// Key-derivation salt.
    pub salt: Vec<u8>,
    /// AEAD nonce.
    pub nonce: Vec<u8>,
    /// AEAD integrity tag.
    pub tag: Vec<u8>,
}

/// Derive a symmetric key from a password and salt.
///
/// Deterministic for a given `(password, salt)` pair.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::EmptyPassword);
    }
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Encrypt `plaintext` under a key derived from `password`.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<SealedPayload, CryptoError> {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = derive_key(password, &salt)?;

    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::EncryptionFailed)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let tag = sealed.split_off(sealed.len() - TAG_LEN);
    Ok(SealedPayload {
        ciphertext: sealed,
        salt,
        nonce: nonce.to_vec(),
        tag,
    })
}

/// Decrypt a sealed payload. Fails closed: any mismatch yields
/// [`CryptoError::AuthenticationFailed`] and no plaintext.
pub fn decrypt(
    ciphertext: &[u8],
    salt: &[u8],
    nonce: &[u8],
    tag: &[u8],
    password: &str,
) -> Result<Vec<u8>, CryptoError> {
    check_len("salt", salt, SALT_LEN)?;
    check_len("nonce", nonce, NONCE_LEN)?;
    check_len("tag", tag, TAG_LEN)?;

    let key = derive_key(password, salt)?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::AuthenticationFailed)?;

    let mut joined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    joined.extend_from_slice(ciphertext);
    joined.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce), joined.as_ref())
        .map_err(|_| CryptoError::AuthenticationFailed)
}

impl SealedPayload {
    /// Convenience wrapper around [`decrypt`].
    pub fn open(&self, password: &str) -> Result<Vec<u8>, CryptoError> {
        decrypt(&self.ciphertext, &self.salt, &self.nonce, &self.tag, password)
    }
}

fn check_len(field: &'static str, value: &[u8], expected: usize) -> Result<(), CryptoError> {
    if value.len() != expected {
        return Err(CryptoError::MalformedEnvelope {
            field,
            expected,
            actual: value.len(),
        });
    }
    Ok(())
}
