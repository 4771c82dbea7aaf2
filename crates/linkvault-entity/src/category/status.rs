//! URL status and its presentation-neutral descriptor.

use serde::{Deserialize, Serialize};

/// Liveness of a link's URL as determined by the last health check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UrlStatus {
    /// Never checked, or not a web URL.
    #[default]
    Unknown,
    /// 2xx or 3xx response.
    Accessible,
    /// Other HTTP error, timeout, or transport error.
    Error,
    /// 404, DNS resolution failure, or connection refused.
    NotFound,
}

/// How alarming a status is, independent of any rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Nothing to report.
    Neutral,
    /// Healthy.
    Ok,
    /// Worth a look.
    Warning,
    /// Broken.
    Critical,
}

/// Presentation-neutral description of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDescriptor {
    /// Short label.
    pub label: &'static str,
    /// Severity tier.
    pub severity: Severity,
}

impl UrlStatus {
    /// Map the status to a label and severity tier.
    pub fn descriptor(self) -> StatusDescriptor {
        match self {
            Self::Unknown => StatusDescriptor {
                label: "Unknown",
                severity: Severity::Neutral,
            },
            Self::Accessible => StatusDescriptor {
                label: "Accessible",
                severity: Severity::Ok,
            },
            Self::Error => StatusDescriptor {
                label: "Error",
                severity: Severity::Warning,
            },
            Self::NotFound => StatusDescriptor {
                label: "Not found",
                severity: Severity::Critical,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_severity_order() {
        assert!(UrlStatus::NotFound.descriptor().severity > UrlStatus::Error.descriptor().severity);
        assert!(UrlStatus::Error.descriptor().severity > UrlStatus::Accessible.descriptor().severity);
        assert_eq!(UrlStatus::Unknown.descriptor().severity, Severity::Neutral);
    }
}
