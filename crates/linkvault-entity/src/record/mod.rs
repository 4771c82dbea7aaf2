//! On-disk envelope of an encrypted category record.
//!
//! A plaintext record is simply the JSON of a [`CategoryItem`]. An encrypted
//! record wraps the ciphertext of that JSON in an [`EncryptedEnvelope`] with a
//! fixed field layout. The `format` marker is what distinguishes "encrypted"
//! from "not encrypted", so a wrong password can never be mistaken for a
//! malformed plaintext record.
//!
//! [`CategoryItem`]: crate::category::CategoryItem

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::category::PasswordProtection;

/// Value of the `format` field of every encrypted envelope.
pub const ENVELOPE_FORMAT: &str = "linkvault-encrypted";

/// Current envelope layout version.
pub const ENVELOPE_VERSION: u32 = 1;

/// Encrypted category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Always [`ENVELOPE_FORMAT`].
    pub format: String,
    /// Layout version.
    pub version: u32,
    /// Cleartext category name, so a locked category can still be listed.
    pub name: String,
    /// Cleartext protection mode, so the right password slot can be resolved.
    pub protection: PasswordProtection,
    /// Per-record key-derivation salt.
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    /// Per-record AEAD nonce.
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    /// AEAD integrity tag.
    #[serde(with = "b64")]
    pub tag: Vec<u8>,
    /// Encrypted category JSON.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Try to interpret raw record bytes as an encrypted envelope.
    ///
    /// Returns `None` when the bytes are not an envelope (for instance a
    /// plaintext record), so callers can fall through to plaintext parsing.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let envelope: Self = serde_json::from_slice(bytes).ok()?;
        (envelope.format == ENVELOPE_FORMAT).then_some(envelope)
    }
}

mod b64 {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedEnvelope {
        EncryptedEnvelope {
            format: ENVELOPE_FORMAT.to_string(),
            version: ENVELOPE_VERSION,
            name: "Work".to_string(),
            protection: PasswordProtection::OwnPassword,
            salt: vec![1; 16],
            nonce: vec![2; 12],
            tag: vec![3; 16],
            ciphertext: vec![4, 5, 6],
        }
    }

    #[test]
    fn test_detect_envelope() {
        let bytes = serde_json::to_vec(&sample()).unwrap();
        let detected = EncryptedEnvelope::detect(&bytes).unwrap();
        assert_eq!(detected, sample());
    }

    #[test]
    fn test_plain_record_is_not_an_envelope() {
        let plain = br#"{ "name": "Work", "links": [] }"#;
        assert!(EncryptedEnvelope::detect(plain).is_none());
    }

    #[test]
    fn test_foreign_format_marker_is_rejected() {
        let mut env = sample();
        env.format = "something-else".to_string();
        let bytes = serde_json::to_vec(&env).unwrap();
        assert!(EncryptedEnvelope::detect(&bytes).is_none());
    }
}
