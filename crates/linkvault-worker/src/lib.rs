//! # linkvault-worker
//!
//! The URL health-check engine: walks a category subtree, probes every
//! HTTP(S) link with bounded concurrency, classifies each response, reports
//! progress and supports mid-flight cancellation.

pub mod error;
pub mod health;

pub use error::HealthCheckError;
pub use health::{
    EngineMetrics, HealthCheckEngine, HttpProber, Progress, RunOutcome, RunState, RunStats,
    UrlProber,
};
