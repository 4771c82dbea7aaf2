//! Run state, progress events and aggregate results.

use serde::Serialize;

use linkvault_entity::UrlStatus;

/// Lifecycle of the most recent run on an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// No run has started yet.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The last run probed every link.
    Completed,
    /// The last run was cancelled.
    Cancelled,
}

/// One completed probe. `current` counts from 1 up to `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Number of probes completed so far, including this one.
    pub current: usize,
    /// Number of HTTP(S) links in the run.
    pub total: usize,
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// HTTP(S) links found in the subtree.
    pub total_urls: usize,
    /// Links classified as accessible.
    pub accessible_count: usize,
    /// Links classified as errors.
    pub error_count: usize,
    /// Links classified as not found.
    pub not_found_count: usize,
}

impl RunStats {
    /// Empty statistics for a run over `total_urls` links.
    pub fn new(total_urls: usize) -> Self {
        Self {
            total_urls,
            ..Self::default()
        }
    }

    /// Count one classified link.
    pub fn record(&mut self, status: UrlStatus) {
        match status {
            UrlStatus::Accessible => self.accessible_count += 1,
            UrlStatus::NotFound => self.not_found_count += 1,
            UrlStatus::Error | UrlStatus::Unknown => self.error_count += 1,
        }
    }

    /// Number of links classified so far.
    pub fn checked(&self) -> usize {
        self.accessible_count + self.error_count + self.not_found_count
    }
}

/// Result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "stats", rename_all = "camelCase")]
pub enum RunOutcome {
    /// Every link was probed.
    Completed(RunStats),
    /// The run was cancelled; the stats cover probes applied before that.
    Cancelled(RunStats),
}

impl RunOutcome {
    /// The aggregate counts.
    pub fn stats(&self) -> &RunStats {
        match self {
            Self::Completed(stats) | Self::Cancelled(stats) => stats,
        }
    }

    /// Whether the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
