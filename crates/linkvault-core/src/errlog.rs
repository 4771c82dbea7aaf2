//! Append-only operator error log.
//!
//! Each failure the store or engine isolates (rather than propagates) is
//! written here as one human-readable line:
//!
//! ```text
//! 2026-10-16T09:12:44.120+00:00 [load_all] SERIALIZATION: Malformed record file=data/categories/Work.json
//! ```
//!
//! The log is read by operators during postmortems, never by core logic.
//! Entries recorded during the process lifetime are also retained in memory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::error::{AppError, ErrorKind};

/// A single error-log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogEntry {
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    /// The operation that failed (e.g. `load_all`, `save`).
    pub operation: String,
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Contextual key/value data such as file path or category name.
    pub context: Vec<(String, String)>,
}

impl ErrorLogEntry {
    /// Render the entry as a single log line.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} [{}] {}: {}",
            self.timestamp.to_rfc3339(),
            self.operation,
            self.kind,
            self.message.replace('\n', " ")
        );
        for (key, value) in &self.context {
            line.push_str(&format!(" {key}={value}"));
        }
        line
    }
}

/// Append-only error log backed by an optional file.
#[derive(Debug, Default)]
pub struct ErrorLog {
    path: Option<PathBuf>,
    entries: Mutex<Vec<ErrorLogEntry>>,
}

impl ErrorLog {
    /// Create an error log appending to the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Create a log that keeps entries in memory only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Record a failure together with its context.
    pub fn record(&self, operation: &str, err: &AppError, context: &[(&str, &str)]) {
        let entry = ErrorLogEntry {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            kind: err.kind,
            message: err.message.clone(),
            context: context
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        };

        error!(operation, kind = %entry.kind, context = ?entry.context, "{}", entry.message);

        if let Some(path) = &self.path {
            if let Err(e) = append_line(path, &entry.to_line()) {
                warn!(path = %path.display(), error = %e, "Failed to append to error log");
            }
        }

        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    /// Snapshot of entries recorded by this process.
    pub fn entries(&self) -> Vec<ErrorLogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of entries recorded by this process.
    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether no entries were recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
