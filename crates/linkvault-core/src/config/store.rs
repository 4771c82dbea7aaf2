//! Category store configuration.

use serde::{Deserialize, Serialize};

/// Where and how persisted category records are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one record per top-level category.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// File extension of encrypted records.
    #[serde(default = "default_encrypted_extension")]
    pub encrypted_extension: String,
    /// File extension of plaintext records.
    #[serde(default = "default_plain_extension")]
    pub plain_extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            encrypted_extension: default_encrypted_extension(),
            plain_extension: default_plain_extension(),
        }
    }
}

fn default_data_dir() -> String {
    "data/categories".to_string()
}

fn default_encrypted_extension() -> String {
    "enc".to_string()
}

fn default_plain_extension() -> String {
    "json".to_string()
}
