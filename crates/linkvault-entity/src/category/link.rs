//! Link entity model.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::status::UrlStatus;

/// A leaf entry referencing a file path or URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkItem {
    /// Display title.
    pub title: String,
    /// URL or file path.
    pub target: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// When the link was created.
    #[serde(default = "Utc::now")]
    pub created_date: DateTime<Utc>,
    /// When the link was last modified.
    #[serde(default = "Utc::now")]
    pub modified_date: DateTime<Utc>,
    /// Size of the referenced file, when the target is a file.
    #[serde(default)]
    pub file_size_bytes: Option<u64>,
    /// Tag identifiers.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Result of the last health check. Session-local, never persisted.
    #[serde(skip)]
    pub url_status: UrlStatus,
    /// Set when the link was moved into the archive.
    #[serde(default)]
    pub archived_date: Option<DateTime<Utc>>,
}

impl LinkItem {
    /// Create a link with the given title and target.
    pub fn new(title: impl Into<String>, target: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            target: target.into(),
            description: String::new(),
            created_date: now,
            modified_date: now,
            file_size_bytes: None,
            tags: BTreeSet::new(),
            url_status: UrlStatus::Unknown,
            archived_date: None,
        }
    }

    /// Create a link pointing to a URL.
    pub fn new_url(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(title, url)
    }

    /// Create a link pointing to a local file, capturing its size if readable.
    pub fn new_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mut link = Self::new(title, path.display().to_string());
        link.file_size_bytes = std::fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());
        link
    }

    /// Parse the target as an HTTP or HTTPS URL.
    pub fn web_url(&self) -> Option<Url> {
        Url::parse(self.target.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
    }

    /// Whether the target is an HTTP or HTTPS URL.
    pub fn is_web_url(&self) -> bool {
        self.web_url().is_some()
    }

    /// Status that should be shown for this link, if any.
    ///
    /// Non-web links never display a status.
    pub fn displayed_status(&self) -> Option<UrlStatus> {
        self.is_web_url().then_some(self.url_status)
    }

    /// Stamp the modification time.
    pub fn touch(&mut self) {
        self.modified_date = Utc::now();
    }
}
