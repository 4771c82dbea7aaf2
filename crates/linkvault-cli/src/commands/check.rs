//! URL health-check command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use linkvault_core::error::AppError;
use linkvault_entity::UrlStatus;
use linkvault_service::NodeId;
use linkvault_worker::{HealthCheckEngine, Progress, RunOutcome};

use super::Session;
use crate::output::{self, OutputFormat};

/// Arguments for `check`
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Dotted category path
    pub path: String,
    /// Override the maximum number of probes in flight
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,
    /// Override the per-probe timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// A link that did not come back accessible
#[derive(Debug, Serialize, Tabled)]
struct ProblemRow {
    /// Category path
    category: String,
    /// Link title
    title: String,
    /// Target URL
    target: String,
    /// Classification
    status: String,
}

/// Run a health check over a category
pub async fn execute(
    session: &Session,
    args: &CheckArgs,
    format: OutputFormat,
) -> Result<(), AppError> {
    let id = session.resolve_unlocked(&args.path).await?;

    let mut config = session.config.health_check.clone();
    if let Some(n) = args.concurrency {
        config.max_concurrency = n;
    }
    if let Some(t) = args.timeout {
        config.probe_timeout_seconds = t;
    }
    let engine = HealthCheckEngine::new(session.catalog.forest(), &config)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
    let reporter = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            output::print_progress(progress.current, progress.total);
        }
        eprintln!();
    });

    let outcome = engine.run(id, tx, cancel).await?;
    let _ = reporter.await;

    let problems = problem_rows(session, id).await?;
    if format == OutputFormat::Json {
        output::print_json(&serde_json::json!({
            "result": outcome,
            "problems": problems,
        }));
        return Ok(());
    }

    let stats = outcome.stats();
    match outcome {
        RunOutcome::Completed(_) => output::print_success("Health check completed"),
        RunOutcome::Cancelled(_) => output::print_warning("Health check cancelled"),
    }
    output::print_kv("Web links", &stats.total_urls.to_string());
    output::print_status_counts(&[
        (UrlStatus::Accessible, stats.accessible_count),
        (UrlStatus::Error, stats.error_count),
        (UrlStatus::NotFound, stats.not_found_count),
    ]);
    if !problems.is_empty() {
        println!();
        output::print_list(&problems, format);
    }
    Ok(())
}

async fn problem_rows(session: &Session, id: NodeId) -> Result<Vec<ProblemRow>, AppError> {
    let forest = session.catalog.forest();
    let forest = forest.read().await;
    let mut rows = Vec::new();
    for link_id in forest.links_in_subtree(id)? {
        let Some(link) = forest.link(link_id) else {
            continue;
        };
        if matches!(
            link.displayed_status(),
            Some(UrlStatus::Error | UrlStatus::NotFound)
        ) {
            rows.push(ProblemRow {
                category: forest.category_path(link_id)?,
                title: link.title.clone(),
                target: link.target.clone(),
                status: output::status_text(link.url_status),
            });
        }
    }
    Ok(rows)
}
