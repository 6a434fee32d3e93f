//! Main listener routes.
//!
//! - `POST /mcp`: JSON-RPC endpoint, policy applied per operation
//! - `ANY /druid/{*path}`, `ANY /status[/{*path}]`: engine pass-through
//!   behind the transport guard middleware
//!
//! Bodies above `max_body_size` are answered with 413.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, post},
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::logging_layer::logging_layer;
use crate::mcp_handler::{McpHandler, handle_mcp_request};
use crate::passthrough::{PassthroughState, enforce_transport_policy, forward};

pub fn build_router(
    mcp: McpHandler,
    passthrough: PassthroughState,
    max_body_size: usize,
) -> Router {
    let engine_routes = Router::new()
        .route("/druid/{*path}", any(forward))
        .route("/status", any(forward))
        .route("/status/{*path}", any(forward))
        .route_layer(middleware::from_fn_with_state(
            passthrough.clone(),
            enforce_transport_policy,
        ))
        .with_state(passthrough);

    Router::new()
        .route("/mcp", post(handle_mcp_request))
        .with_state(mcp)
        .merge(engine_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(logging_layer())
}
