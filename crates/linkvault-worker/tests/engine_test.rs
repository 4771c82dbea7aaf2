//! Integration tests for the health-check engine.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::get;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use url::Url;

use linkvault_core::config::health_check::HealthCheckConfig;
use linkvault_entity::{CategoryItem, LinkItem, UrlStatus};
use linkvault_service::{Forest, NodeId, SharedForest};
use linkvault_worker::{
    HealthCheckEngine, HealthCheckError, Progress, RunOutcome, RunState, UrlProber,
};

async fn spawn_fixture() -> SocketAddr {
    let app = Router::new()
        .route("/ok", get(|| async { StatusCode::OK }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/moved", get(|| async { Redirect::temporary("/ok") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A local port with nothing listening on it.
async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn forest_with(links: Vec<LinkItem>) -> (SharedForest, NodeId, Vec<NodeId>) {
    let mut category = CategoryItem::new("Check");
    category.links = links;
    let mut forest = Forest::new();
    let root = forest.add_root(category).unwrap();
    let ids = forest.links_in_subtree(root).unwrap();
    (Arc::new(RwLock::new(forest)), root, ids)
}

async fn status_of(forest: &SharedForest, id: NodeId) -> UrlStatus {
    forest.read().await.link(id).unwrap().url_status
}

fn drain(mut rx: mpsc::UnboundedReceiver<Progress>) -> Vec<Progress> {
    let mut events = Vec::new();
    while let Ok(p) = rx.try_recv() {
        events.push(p);
    }
    events
}

#[tokio::test]
async fn test_http_classification() {
    let addr = spawn_fixture().await;
    let refused = closed_port().await;
    let links = vec![
        LinkItem::new_url("ok", format!("http://{addr}/ok")),
        LinkItem::new_url("missing", format!("http://{addr}/missing")),
        LinkItem::new_url("broken", format!("http://{addr}/broken")),
        LinkItem::new_url("moved", format!("http://{addr}/moved")),
        LinkItem::new_url("refused", format!("http://{refused}/")),
    ];
    let (forest, root, ids) = forest_with(links);
    let engine = HealthCheckEngine::new(Arc::clone(&forest), &HealthCheckConfig::default()).unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let outcome = engine.run(root, tx, CancellationToken::new()).await.unwrap();

    let stats = *outcome.stats();
    assert!(!outcome.is_cancelled());
    assert_eq!(stats.total_urls, 5);
    assert_eq!(stats.accessible_count, 2);
    assert_eq!(stats.not_found_count, 2);
    assert_eq!(stats.error_count, 1);

    assert_eq!(status_of(&forest, ids[0]).await, UrlStatus::Accessible);
    assert_eq!(status_of(&forest, ids[1]).await, UrlStatus::NotFound);
    assert_eq!(status_of(&forest, ids[2]).await, UrlStatus::Error);
    assert_eq!(status_of(&forest, ids[3]).await, UrlStatus::Accessible);
    assert_eq!(status_of(&forest, ids[4]).await, UrlStatus::NotFound);
    assert_eq!(engine.state(), RunState::Completed);
}

#[tokio::test]
async fn test_timeout_is_an_error() {
    let addr = spawn_fixture().await;
    let (forest, root, ids) = forest_with(vec![LinkItem::new_url(
        "slow",
        format!("http://{addr}/slow"),
    )]);
    let config = HealthCheckConfig {
        probe_timeout_seconds: 1,
        ..HealthCheckConfig::default()
    };
    let engine = HealthCheckEngine::new(Arc::clone(&forest), &config).unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let outcome = engine.run(root, tx, CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.stats().error_count, 1);
    assert_eq!(status_of(&forest, ids[0]).await, UrlStatus::Error);
}

#[tokio::test]
async fn test_failed_handshake_is_an_error_not_missing() {
    let addr = spawn_fixture().await;
    let links = vec![
        LinkItem::new_url("tls", format!("https://{addr}/ok")),
        LinkItem::new_url("unresolvable", "http://no-such-host.invalid/"),
    ];
    let (forest, root, ids) = forest_with(links);
    let config = HealthCheckConfig {
        probe_timeout_seconds: 5,
        ..HealthCheckConfig::default()
    };
    let engine = HealthCheckEngine::new(Arc::clone(&forest), &config).unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let outcome = engine.run(root, tx, CancellationToken::new()).await.unwrap();

    assert_eq!(status_of(&forest, ids[0]).await, UrlStatus::Error);
    assert_eq!(status_of(&forest, ids[1]).await, UrlStatus::NotFound);
    assert_eq!(outcome.stats().error_count, 1);
    assert_eq!(outcome.stats().not_found_count, 1);
}

/// Answers instantly for hosts starting with "fast", never for others.
/// Tracks how many probes are in flight at once.
#[derive(Debug, Default)]
struct FakeProber {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Option<Duration>,
}

#[async_trait]
impl UrlProber for FakeProber {
    async fn probe(&self, url: &Url) -> UrlStatus {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !url.host_str().unwrap_or("").starts_with("fast") {
            std::future::pending::<()>().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        UrlStatus::Accessible
    }
}

fn web_links(prefix: &str, count: usize) -> Vec<LinkItem> {
    (0..count)
        .map(|i| LinkItem::new_url(format!("{prefix}{i}"), format!("https://{prefix}{i}.example/")))
        .collect()
}

#[tokio::test]
async fn test_progress_is_monotonic_and_complete() {
    let mut links = web_links("fast", 12);
    links.push(LinkItem::new("notes", "/home/me/notes.txt"));
    links.push(LinkItem::new("share", "\\\\server\\share\\doc.pdf"));
    let (forest, root, ids) = forest_with(links);
    let engine = HealthCheckEngine::with_prober(
        Arc::clone(&forest),
        &HealthCheckConfig::default(),
        Arc::new(FakeProber::default()),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let outcome = engine.run(root, tx, CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.stats().total_urls, 12);

    let events = drain(rx);
    assert_eq!(events.len(), 12);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.current, i + 1);
        assert_eq!(event.total, 12);
    }

    assert_eq!(status_of(&forest, ids[12]).await, UrlStatus::Unknown);
    assert_eq!(status_of(&forest, ids[13]).await, UrlStatus::Unknown);
}

#[tokio::test]
async fn test_fan_out_is_capped() {
    let (forest, root, _) = forest_with(web_links("fast", 20));
    let prober = Arc::new(FakeProber {
        delay: Some(Duration::from_millis(20)),
        ..FakeProber::default()
    });
    let config = HealthCheckConfig {
        max_concurrency: 3,
        ..HealthCheckConfig::default()
    };
    let engine = HealthCheckEngine::with_prober(Arc::clone(&forest), &config, prober.clone());

    let (tx, _rx) = mpsc::unbounded_channel();
    let outcome = engine.run(root, tx, CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.stats().accessible_count, 20);
    let peak = prober.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight probes was {peak}");
    assert!(peak > 1, "probes never overlapped");
}

#[tokio::test]
async fn test_cancellation_discards_in_flight_results() {
    let mut links = web_links("fast", 3);
    links.extend(web_links("stuck", 4));
    let (forest, root, ids) = forest_with(links);
    let engine = Arc::new(HealthCheckEngine::with_prober(
        Arc::clone(&forest),
        &HealthCheckConfig::default(),
        Arc::new(FakeProber::default()),
    ));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        async move { engine.run(root, tx, cancel).await }
    });

    let mut seen = 0;
    while seen < 3 {
        rx.recv().await.unwrap();
        seen += 1;
    }
    cancel.cancel();

    let outcome = run.await.unwrap().unwrap();
    let stats = *outcome.stats();
    assert!(matches!(outcome, RunOutcome::Cancelled(_)));
    assert_eq!(stats.total_urls, 7);
    assert!(stats.checked() <= 3);
    assert_eq!(engine.state(), RunState::Cancelled);

    for &id in &ids[3..] {
        assert_eq!(status_of(&forest, id).await, UrlStatus::Unknown);
    }
}

#[tokio::test]
async fn test_second_run_is_rejected_while_running() {
    let (forest, root, _) = forest_with(web_links("stuck", 2));
    let engine = Arc::new(HealthCheckEngine::with_prober(
        Arc::clone(&forest),
        &HealthCheckConfig::default(),
        Arc::new(FakeProber::default()),
    ));

    let cancel = CancellationToken::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        async move { engine.run(root, tx, cancel).await }
    });
    while engine.state() != RunState::Running {
        tokio::task::yield_now().await;
    }

    let (tx2, _rx2) = mpsc::unbounded_channel();
    let second = engine.run(root, tx2, CancellationToken::new()).await;
    assert!(matches!(second, Err(HealthCheckError::AlreadyRunning)));
    assert_eq!(engine.state(), RunState::Running);

    cancel.cancel();
    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(engine.metrics().snapshot().runs_rejected, 1);
}

#[tokio::test]
async fn test_locked_or_stale_category_is_rejected() {
    let (forest, root, ids) = forest_with(web_links("fast", 1));
    let engine = HealthCheckEngine::with_prober(
        Arc::clone(&forest),
        &HealthCheckConfig::default(),
        Arc::new(FakeProber::default()),
    );

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = engine
        .run(ids[0], tx, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthCheckError::Category(_)));
    assert_eq!(engine.state(), RunState::Idle);

    forest.write().await.remove(root).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(engine.run(root, tx, CancellationToken::new()).await.is_err());
}
