//! Health-check engine errors.
//!
//! Per-URL failures are never errors: they are classified into a
//! [`UrlStatus`](linkvault_entity::UrlStatus). Only conditions that prevent a
//! run from starting surface here.

use linkvault_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Reasons a health-check run could not be performed.
#[derive(Debug, Error)]
pub enum HealthCheckError {
    /// Another run is in progress on this engine.
    #[error("A health check is already running")]
    AlreadyRunning,

    /// The HTTP client could not be built from configuration.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The category to check could not be resolved in the forest.
    #[error("Cannot check category: {0}")]
    Category(#[source] AppError),
}

impl From<HealthCheckError> for AppError {
    fn from(err: HealthCheckError) -> Self {
        let message = err.to_string();
        match err {
            HealthCheckError::AlreadyRunning => AppError::already_running(message),
            HealthCheckError::Client(e) => AppError::with_source(ErrorKind::Network, message, e),
            HealthCheckError::Category(e) => {
                let kind = e.kind;
                AppError::with_source(kind, message, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_maps_to_kind() {
        let err: AppError = HealthCheckError::AlreadyRunning.into();
        assert_eq!(err.kind, ErrorKind::AlreadyRunning);
    }

    #[test]
    fn test_client_error_maps_to_network() {
        let build = reqwest::Client::builder()
            .user_agent("bad\nagent")
            .build()
            .unwrap_err();
        let err: AppError = HealthCheckError::Client(build).into();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.message.starts_with("Failed to build HTTP client"));
    }

    #[test]
    fn test_category_error_keeps_kind() {
        let err: AppError = HealthCheckError::Category(AppError::not_found("gone")).into();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains("gone"));
    }
}
