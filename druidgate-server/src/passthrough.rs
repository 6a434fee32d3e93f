//! Raw Druid API pass-through.
//!
//! `ANY /druid/{*path}` and `ANY /status[/{*path}]` are relayed to the
//! router unchanged. [`enforce_transport_policy`] sits in front of these
//! routes and answers 405 for anything the transport guard rejects, so in
//! read-only mode only `GET` and `POST /druid/v2/sql` reach the engine.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;
use tracing::{info, warn};

use druidgate_core::engine::DruidApi;
use druidgate_core::error::DruidGateError;
use druidgate_core::policy::{TransportDenied, TransportGuard};

use crate::metrics::DruidGateMetrics;

#[derive(Clone)]
pub struct PassthroughState {
    pub engine: Arc<dyn DruidApi>,
    pub guard: TransportGuard,
    pub metrics: Option<Arc<DruidGateMetrics>>,
}

impl PassthroughState {
    pub fn new(engine: Arc<dyn DruidApi>, guard: TransportGuard) -> Self {
        Self {
            engine,
            guard,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DruidGateMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Route-layer middleware applying the transport guard.
pub async fn enforce_transport_policy(
    State(state): State<PassthroughState>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(denied) = state.guard.check(request.method(), request.uri().path()) {
        info!(
            method = %denied.method,
            path = %denied.path,
            "Engine request denied in read-only mode"
        );
        if let Some(metrics) = &state.metrics {
            metrics.record_transport_denial(request.method());
        }
        return method_not_allowed(&denied);
    }
    next.run(request).await
}

fn method_not_allowed(denied: &TransportDenied) -> Response {
    let mut response = (
        denied.status_code(),
        Json(json!({
            "error": "method_not_allowed",
            "message": denied.to_string(),
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
    response
}

/// Relay one request to the engine.
pub async fn forward(
    State(state): State<PassthroughState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let body = (!body.is_empty()).then_some(body);

    match state.engine.send(method, path_and_query, body).await {
        Ok(engine_response) => {
            let status =
                StatusCode::from_u16(engine_response.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = Response::new(Body::from(engine_response.body));
            *response.status_mut() = status;
            if let Some(value) = engine_response
                .content_type
                .as_deref()
                .and_then(|ct| HeaderValue::from_str(ct).ok())
            {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response
        }
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &DruidGateError) -> Response {
    if !matches!(error, DruidGateError::TransportDenied { .. }) {
        warn!(error = %error, "Pass-through request failed");
    }
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (
        status,
        Json(json!({
            "error": error.error_type_name(),
            "message": error.to_string(),
        })),
    )
        .into_response();
    if status == StatusCode::METHOD_NOT_ALLOWED {
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
    }
    response
}
