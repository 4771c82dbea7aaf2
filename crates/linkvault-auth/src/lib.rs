//! # linkvault-auth
//!
//! Secrets handling for LinkVault:
//!
//! - [`crypto`]: Argon2id key derivation and AES-256-GCM sealing of record
//!   payloads
//! - [`password`]: the session password cache consulted by the category store

pub mod crypto;
pub mod password;

pub use crypto::{CryptoError, SealedPayload};
pub use password::PasswordCache;
