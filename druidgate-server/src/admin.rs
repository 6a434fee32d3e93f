//! Admin server for health checks and metrics.
//!
//! Runs on its own port so health checks and scrapes never share a listener with
//! MCP clients:
//!
//! - `GET /health`: liveness
//! - `GET /ready`: readiness (engine reachable at least once, not draining)
//! - `GET /metrics`: OpenMetrics text from prometheus-client

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::registry::Registry;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ServerError;

/// Process readiness flags shared with `main`.
#[derive(Debug)]
pub struct Readiness {
    started_at: Instant,
    read_only: bool,
    engine_reachable: AtomicBool,
    draining: AtomicBool,
}

impl Readiness {
    pub fn new(read_only: bool) -> Self {
        Self {
            started_at: Instant::now(),
            read_only,
            engine_reachable: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    /// Latches once the Druid health check has passed (or was skipped).
    pub fn mark_engine_reachable(&self) {
        self.engine_reachable.store(true, Ordering::Release);
    }

    pub fn mark_draining(&self) {
        self.draining.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.engine_reachable.load(Ordering::Acquire) && !self.draining.load(Ordering::Acquire)
    }

    fn checks(&self) -> ReadinessChecks {
        ReadinessChecks {
            engine_reachable: self.engine_reachable.load(Ordering::Acquire),
            draining: self.draining.load(Ordering::Acquire),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReadinessChecks {
    engine_reachable: bool,
    draining: bool,
}

#[derive(Clone)]
pub struct AdminState {
    pub readiness: Arc<Readiness>,
    pub registry: Arc<Registry>,
}

pub struct AdminServer {
    bind_addr: String,
    state: AdminState,
}

impl AdminServer {
    pub fn new(
        bind_addr: impl Into<String>,
        readiness: Arc<Readiness>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            state: AdminState {
                readiness,
                registry,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind_addr.clone(),
                source,
            })?;

        info!(addr = %self.bind_addr, "Admin server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("Admin server shutting down");
            })
            .await
            .map_err(ServerError::Serve)
    }
}

async fn health_handler(State(state): State<AdminState>) -> Response {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.readiness.started_at.elapsed().as_secs(),
        "read_only": state.readiness.read_only,
    }))
    .into_response()
}

async fn readiness_handler(State(state): State<AdminState>) -> Response {
    let readiness = &state.readiness;
    let (status, label) = if readiness.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };
    (
        status,
        Json(json!({
            "status": label,
            "checks": readiness.checks(),
        })),
    )
        .into_response()
}

async fn metrics_handler(State(state): State<AdminState>) -> Response {
    let mut buffer = String::new();

    if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &state.registry) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        buffer,
    )
        .into_response()
}
