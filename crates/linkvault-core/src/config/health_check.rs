//! URL health-check configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the concurrent URL health-check engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Maximum number of probes in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    /// Maximum redirects followed before a probe is classified.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User-Agent header sent with every probe.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HealthCheckConfig {
    /// The probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            probe_timeout_seconds: default_probe_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_concurrency() -> usize {
    8
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("linkvault/{}", env!("CARGO_PKG_VERSION"))
}
