//! Single-URL probing.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use linkvault_core::config::health_check::HealthCheckConfig;
use linkvault_entity::UrlStatus;

use super::classify::{classify_status, classify_transport_error};
use crate::error::HealthCheckError;

/// Checks one URL and classifies the result.
///
/// Implementations never fail: every transport problem is folded into a
/// [`UrlStatus`].
#[async_trait]
pub trait UrlProber: Send + Sync + Debug {
    /// Probe `url` once.
    async fn probe(&self, url: &Url) -> UrlStatus;
}

/// Probes with an HTTP `HEAD` request, so no body is downloaded.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Build a prober with the configured timeout, redirect limit and
    /// user agent.
    pub fn new(config: &HealthCheckConfig) -> Result<Self, HealthCheckError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .timeout(config.probe_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(HealthCheckError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn probe(&self, url: &Url) -> UrlStatus {
        match self.client.head(url.clone()).send().await {
            Ok(response) => {
                let status = classify_status(response.status());
                debug!(url = %url, http_status = %response.status(), ?status, "Probe answered");
                status
            }
            Err(e) => {
                let status = classify_transport_error(&e);
                debug!(url = %url, error = %e, ?status, "Probe failed");
                status
            }
        }
    }
}
