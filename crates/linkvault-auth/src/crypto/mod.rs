//! Record encryption: key derivation plus authenticated encryption.

pub mod cipher;
pub mod error;

pub use cipher::{KEY_LEN, NONCE_LEN, SALT_LEN, SealedPayload, TAG_LEN, decrypt, derive_key, encrypt};
pub use error::CryptoError;
