//! HTTP Server and Periodic Census
//!
//! Long-running alternative to the one-shot run: the census is repeated on an
//! interval and the latest snapshot is served to Prometheus directly.
//!
//! # Architecture
//!
//! - **HTTP Server**: Axum-based server exposing `/metrics`, `/health`, and `/` endpoints
//! - **Census Loop**: Background task that runs the census every N seconds
//! - **Snapshot**: The last rendered exposition, swapped as a whole after each run
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET /metrics` - Latest census in Prometheus text format (empty before the first run)
//! - `GET /health` - 200 if the last run reached at least one community, 503 otherwise
//!
//! # Error Handling
//!
//! Endpoint failures only affect the communities they belong to. A render
//! failure keeps the loop alive and makes `/metrics` answer 500 until the next
//! successful run.

use crate::config::Config;
use crate::error::ExporterError;
use crate::fetch::HttpFetcher;
use crate::pipeline::Census;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{error, info};

/// Outcome of the most recent census
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub body: String,
    pub render_error: Option<String>,
    pub communities_up: usize,
}

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    census: Arc<Census<HttpFetcher>>,
    snapshot: Arc<RwLock<Snapshot>>,
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let census = Arc::new(Census::from_config(&config)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        census,
        snapshot: Arc::new(RwLock::new(Snapshot::default())),
    };

    // Start background census collection
    let collection_state = state.clone();
    tokio::spawn(async move {
        census_loop(collection_state).await;
    });

    let app = router(state);

    // Start the server
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn census_loop(state: AppState) {
    let mut ticker = interval(Duration::from_secs(
        state.config.server.interval_seconds.max(1),
    ));

    loop {
        ticker.tick().await;

        let report = state.census.run(&state.config.communities).await;
        report.log_summary();

        let summary = report.summary();
        let next = match report.render() {
            Ok(body) => Snapshot {
                body,
                render_error: None,
                communities_up: summary.communities_up,
            },
            Err(e) => {
                error!("Failed to render census: {}", e);
                Snapshot {
                    body: String::new(),
                    render_error: Some(e.to_string()),
                    communities_up: summary.communities_up,
                }
            }
        };

        *state.snapshot.write().await = next;
    }
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>Gluon Census Exporter</title></head>
<body>
<h1>Gluon Census Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.snapshot.read().await;
    match &snapshot.render_error {
        None => snapshot.body.clone().into_response(),
        Some(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error rendering metrics: {}", e),
        )
            .into_response(),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.snapshot.read().await.communities_up > 0 {
        (StatusCode::OK, "OK")
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "No community reachable in the last census",
        )
    }
}
