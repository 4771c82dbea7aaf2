//! The health-check run loop.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use linkvault_core::config::health_check::HealthCheckConfig;
use linkvault_core::error::AppError;
use linkvault_entity::UrlStatus;
use linkvault_service::{NodeData, NodeId, SharedForest};

use super::metrics::EngineMetrics;
use super::outcome::{Progress, RunOutcome, RunState, RunStats};
use super::prober::{HttpProber, UrlProber};
use crate::error::HealthCheckError;

/// Probes every HTTP(S) link under a category with bounded concurrency.
///
/// One engine runs at most one check at a time. Probe results are applied
/// to the shared forest by a single collector loop, which is also where
/// progress events are emitted, so `current` rises by exactly one per event.
#[derive(Debug)]
pub struct HealthCheckEngine {
    /// Forest whose link statuses are updated.
    forest: SharedForest,
    /// Probe implementation.
    prober: Arc<dyn UrlProber>,
    /// Maximum probes in flight.
    max_concurrency: usize,
    /// Upper bound on a single probe, whatever the prober does.
    probe_timeout: Duration,
    /// State of the current or most recent run.
    state: Mutex<RunState>,
    /// Lifetime counters.
    metrics: Arc<EngineMetrics>,
}

/// Resets the engine to idle if a run ends without reporting an outcome.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, outcome: RunState) {
        *lock(self.state) = outcome;
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *lock(self.state) = RunState::Idle;
        }
    }
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HealthCheckEngine {
    /// Create an engine that probes over HTTP.
    pub fn new(forest: SharedForest, config: &HealthCheckConfig) -> Result<Self, HealthCheckError> {
        let prober = HttpProber::new(config)?;
        Ok(Self::with_prober(forest, config, Arc::new(prober)))
    }

    /// Create an engine with a custom prober.
    pub fn with_prober(
        forest: SharedForest,
        config: &HealthCheckConfig,
        prober: Arc<dyn UrlProber>,
    ) -> Self {
        Self {
            forest,
            prober,
            max_concurrency: config.max_concurrency.max(1),
            probe_timeout: config.probe_timeout(),
            state: Mutex::new(RunState::Idle),
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// State of the current or most recent run.
    pub fn state(&self) -> RunState {
        *lock(&self.state)
    }

    /// Lifetime counters.
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Check every HTTP(S) link at or below `category`.
    ///
    /// Each completed probe sets the link's status in place and sends one
    /// [`Progress`] on `progress`. Cancelling `cancel` stops new probes from
    /// starting; probes already in flight run to completion or timeout in the
    /// background and their results are discarded.
    ///
    /// Fails fast with [`HealthCheckError::AlreadyRunning`] if another run is
    /// in progress; that run is not affected.
    #[instrument(skip(self, progress, cancel), fields(run_id))]
    pub async fn run(
        &self,
        category: NodeId,
        progress: UnboundedSender<Progress>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, HealthCheckError> {
        let guard = self.begin()?;
        let run_id = Uuid::now_v7();
        tracing::Span::current().record("run_id", run_id.to_string());

        let targets = self
            .collect_targets(category)
            .await
            .map_err(HealthCheckError::Category)?;
        let total = targets.len();
        info!(total, max_concurrency = self.max_concurrency, "Health check started");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut in_flight = JoinSet::new();

        for (id, url) in targets {
            let semaphore = Arc::clone(&semaphore);
            let prober = Arc::clone(&self.prober);
            let cancel = cancel.clone();
            let timeout = self.probe_timeout;
            in_flight.spawn(async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return (id, None),
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (id, None),
                    },
                };
                if cancel.is_cancelled() {
                    return (id, None);
                }
                let status = tokio::time::timeout(timeout, prober.probe(&url))
                    .await
                    .unwrap_or(UrlStatus::Error);
                (id, Some(status))
            });
        }

        let mut stats = RunStats::new(total);
        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break true,
                joined = in_flight.join_next() => {
                    let (link, status) = match joined {
                        None => break false,
                        Some(Ok((_, None))) => continue,
                        Some(Ok((link, Some(status)))) => (link, status),
                        Some(Err(e)) => {
                            warn!(error = %e, "Probe task failed");
                            continue;
                        }
                    };
                    self.apply(link, status, &mut stats).await;
                    let _ = progress.send(Progress {
                        current: stats.checked(),
                        total,
                    });
                }
            }
        };

        let outcome = if cancelled {
            let abandoned = in_flight.len();
            in_flight.detach_all();
            self.metrics.record_discarded(abandoned);
            self.metrics.runs_cancelled.fetch_add(1, Ordering::Relaxed);
            info!(checked = stats.checked(), total, abandoned, "Health check cancelled");
            guard.finish(RunState::Cancelled);
            RunOutcome::Cancelled(stats)
        } else {
            self.metrics.runs_completed.fetch_add(1, Ordering::Relaxed);
            info!(
                total,
                accessible = stats.accessible_count,
                errors = stats.error_count,
                not_found = stats.not_found_count,
                "Health check completed"
            );
            guard.finish(RunState::Completed);
            RunOutcome::Completed(stats)
        };
        Ok(outcome)
    }

    fn begin(&self) -> Result<RunGuard<'_>, HealthCheckError> {
        let mut state = lock(&self.state);
        if *state == RunState::Running {
            self.metrics.runs_rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Rejected health check: another run is in progress");
            return Err(HealthCheckError::AlreadyRunning);
        }
        *state = RunState::Running;
        self.metrics.runs_started.fetch_add(1, Ordering::Relaxed);
        Ok(RunGuard {
            state: &self.state,
            finished: false,
        })
    }

    /// Web links in pre-order traversal order. Non-web links are left out.
    async fn collect_targets(&self, category: NodeId) -> Result<Vec<(NodeId, Url)>, AppError> {
        let forest = self.forest.read().await;
        match forest.data(category) {
            Some(NodeData::Category(_)) => {}
            Some(NodeData::Locked(locked)) => {
                return Err(AppError::locked(format!(
                    "Category '{}' is locked",
                    locked.name
                )));
            }
            Some(NodeData::Link(_)) => {
                return Err(AppError::validation("Health checks run on categories"));
            }
            None => return Err(AppError::not_found("Category no longer exists")),
        }

        Ok(forest
            .links_in_subtree(category)?
            .into_iter()
            .filter_map(|id| forest.link(id).and_then(|l| l.web_url()).map(|url| (id, url)))
            .collect())
    }

    async fn apply(&self, link: NodeId, status: UrlStatus, stats: &mut RunStats) {
        stats.record(status);
        self.metrics.record_probe(status);
        if !self.forest.write().await.set_url_status(link, status) {
            debug!(?link, "Link vanished before its status could be applied");
        }
    }
}
