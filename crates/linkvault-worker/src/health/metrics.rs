//! Lifetime counters for an engine instance.
//!
//! Updated with atomics so they can be read while a run is in progress.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use linkvault_entity::UrlStatus;

/// Engine counters accumulated across runs.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Runs started.
    pub runs_started: AtomicU64,
    /// Runs that probed every link.
    pub runs_completed: AtomicU64,
    /// Runs that were cancelled.
    pub runs_cancelled: AtomicU64,
    /// Runs rejected because another was in progress.
    pub runs_rejected: AtomicU64,
    /// Probes whose result was applied.
    pub probes_applied: AtomicU64,
    /// Probes whose result was discarded after cancellation.
    pub probes_discarded: AtomicU64,
    /// Applied probes classified as accessible.
    pub accessible: AtomicU64,
    /// Applied probes classified as errors.
    pub errors: AtomicU64,
    /// Applied probes classified as not found.
    pub not_found: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Runs started.
    pub runs_started: u64,
    /// Runs completed.
    pub runs_completed: u64,
    /// Runs cancelled.
    pub runs_cancelled: u64,
    /// Runs rejected.
    pub runs_rejected: u64,
    /// Probes applied.
    pub probes_applied: u64,
    /// Probes discarded.
    pub probes_discarded: u64,
}

impl EngineMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied probe result.
    pub fn record_probe(&self, status: UrlStatus) {
        self.probes_applied.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            UrlStatus::Accessible => &self.accessible,
            UrlStatus::NotFound => &self.not_found,
            UrlStatus::Error | UrlStatus::Unknown => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record in-flight probes abandoned by a cancelled run.
    pub fn record_discarded(&self, count: usize) {
        self.probes_discarded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Take a snapshot of the run and probe counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_cancelled: self.runs_cancelled.load(Ordering::Relaxed),
            runs_rejected: self.runs_rejected.load(Ordering::Relaxed),
            probes_applied: self.probes_applied.load(Ordering::Relaxed),
            probes_discarded: self.probes_discarded.load(Ordering::Relaxed),
        }
    }
}
