//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so an empty or missing
//! file still yields a usable configuration.

pub mod health_check;
pub mod logging;
pub mod store;

use serde::{Deserialize, Serialize};

use self::health_check::HealthCheckConfig;
use self::logging::LoggingConfig;
use self::store::StoreConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Category store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// URL health-check settings.
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default`, an environment-specific overlay and
    /// environment variables prefixed with `LINKVAULT__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", env)
    }

    /// Load configuration with an explicit base file path (extension optional).
    pub fn load_from(base: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LINKVAULT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = AppConfig::default();
        assert_eq!(config.health_check.max_concurrency, 8);
        assert_eq!(config.health_check.probe_timeout_seconds, 10);
        assert_eq!(config.store.encrypted_extension, "enc");
        assert_eq!(config.store.plain_extension, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[health_check]\nmax_concurrency = 3\n\n[store]\ndata_dir = \"/tmp/lv\"\n",
        )
        .unwrap();

        let base = path.with_extension("");
        let config = AppConfig::load_from(base.to_str().unwrap(), "does-not-exist").unwrap();
        assert_eq!(config.health_check.max_concurrency, 3);
        assert_eq!(config.health_check.probe_timeout_seconds, 10);
        assert_eq!(config.store.data_dir, "/tmp/lv");
    }
}
