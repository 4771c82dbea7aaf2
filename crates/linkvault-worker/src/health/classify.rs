//! Mapping probe results to [`UrlStatus`].

use std::error::Error as StdError;
use std::io;

use reqwest::StatusCode;

use linkvault_entity::UrlStatus;

/// Classify a received HTTP response status.
///
/// 2xx and 3xx are accessible, 404 is not found, anything else is an error.
pub fn classify_status(status: StatusCode) -> UrlStatus {
    if status.is_success() || status.is_redirection() {
        UrlStatus::Accessible
    } else if status == StatusCode::NOT_FOUND {
        UrlStatus::NotFound
    } else {
        UrlStatus::Error
    }
}

/// Classify a request that produced no response.
///
/// A timeout is an error even when it happened while connecting. A host
/// that cannot be resolved or refuses the connection counts as not found.
/// Every other connect failure, TLS handshakes included, is an error.
pub fn classify_transport_error(err: &reqwest::Error) -> UrlStatus {
    if err.is_timeout() {
        UrlStatus::Error
    } else if err.is_connect() && is_unreachable_host(err) {
        UrlStatus::NotFound
    } else if let Some(status) = err.status() {
        classify_status(status)
    } else {
        UrlStatus::Error
    }
}

/// Whether the error chain bottoms out in a failed name lookup or a
/// refused or unroutable connection.
fn is_unreachable_host(err: &reqwest::Error) -> bool {
    let mut cause: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(current) = cause {
        if current
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| is_unreachable_kind(io_err.kind()))
        {
            return true;
        }
        // The connector reports resolver failures as a message, not a type.
        let message = current.to_string();
        if message.contains("dns error") || message.contains("failed to lookup address") {
            return true;
        }
        cause = current.source();
    }
    false
}

fn is_unreachable_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), UrlStatus::Accessible);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), UrlStatus::Accessible);
        assert_eq!(classify_status(StatusCode::FOUND), UrlStatus::Accessible);
        assert_eq!(classify_status(StatusCode::NOT_MODIFIED), UrlStatus::Accessible);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), UrlStatus::NotFound);
        assert_eq!(classify_status(StatusCode::GONE), UrlStatus::Error);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), UrlStatus::Error);
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            UrlStatus::Error
        );
        assert_eq!(classify_status(StatusCode::CONTINUE), UrlStatus::Error);
    }

    #[test]
    fn test_unreachable_kinds() {
        assert!(is_unreachable_kind(io::ErrorKind::ConnectionRefused));
        assert!(is_unreachable_kind(io::ErrorKind::NetworkUnreachable));
        assert!(!is_unreachable_kind(io::ErrorKind::InvalidData));
        assert!(!is_unreachable_kind(io::ErrorKind::ConnectionReset));
    }
}
