//! URL health checking.

pub mod classify;
pub mod engine;
pub mod metrics;
pub mod outcome;
pub mod prober;

pub use engine::HealthCheckEngine;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use outcome::{Progress, RunOutcome, RunState, RunStats};
pub use prober::{HttpProber, UrlProber};
