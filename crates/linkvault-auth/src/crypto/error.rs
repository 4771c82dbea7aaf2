//! Crypto error type.

use linkvault_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Failures of key derivation, sealing, or opening.
///
/// None of the variants ever carry the password.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// An empty password was supplied.
    #[error("Password must not be empty")]
    EmptyPassword,

    /// Wrong password, or the ciphertext/tag/nonce was tampered with.
    #[error("Authentication failed: wrong password or corrupted data")]
    AuthenticationFailed,

    /// Salt, nonce, or tag has the wrong length.
    #[error("Malformed encrypted payload: {field} must be {expected} bytes, got {actual}")]
    MalformedEnvelope {
        /// Offending field.
        field: &'static str,
        /// Required length.
        expected: usize,
        /// Observed length.
        actual: usize,
    },

    /// The key-derivation function rejected its parameters.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// The cipher failed while sealing.
    #[error("Encryption failed")]
    EncryptionFailed,
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        let message = err.to_string();
        match err {
            CryptoError::EmptyPassword => AppError::validation(message),
            _ => AppError::with_source(ErrorKind::Cryptographic, message, err),
        }
    }
}
