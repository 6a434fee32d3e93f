//! Shared harness: the real router wired to a wiremock Druid router.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::MockServer;

use druidgate_core::engine::{DruidApi, DruidClient, EngineConfig};
use druidgate_core::policy::{PolicyState, TransportGuard};
use druidgate_server::mcp_handler::McpHandler;
use druidgate_server::passthrough::PassthroughState;
use druidgate_server::router::build_router;

pub const MAX_BODY_SIZE: usize = 64 * 1024;

pub fn app(druid: &MockServer, read_only: bool) -> Router {
    app_with(druid, read_only, 50, MAX_BODY_SIZE)
}

pub fn app_with(
    druid: &MockServer,
    read_only: bool,
    page_size: usize,
    max_body_size: usize,
) -> Router {
    app_at(druid.uri(), read_only, page_size, max_body_size)
}

/// Router pointed at an arbitrary Druid URL.
pub fn app_at(
    router_url: String,
    read_only: bool,
    page_size: usize,
    max_body_size: usize,
) -> Router {
    let policy = PolicyState::new(read_only);
    let guard = TransportGuard::new(policy);
    let client = DruidClient::new(EngineConfig::with_router_url(router_url), guard)
        .expect("mock server URL is valid");
    let engine: Arc<dyn DruidApi> = Arc::new(client);

    let mcp = McpHandler::new(engine.clone(), policy, page_size);
    let passthrough = PassthroughState::new(engine, guard);
    build_router(mcp, passthrough, max_body_size)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body: body.to_vec(),
    }
}

pub async fn rpc(app: &Router, method: &str, params: Value) -> Value {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
    let reply = send(app, Method::POST, "/mcp", body.to_string()).await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.json()
}

pub async fn call_tool(app: &Router, name: &str, arguments: Value) -> Value {
    let params = json!({"name": name, "arguments": arguments});
    rpc(app, "tools/call", params).await
}

pub async fn tool_names(app: &Router) -> Vec<String> {
    let response = rpc(app, "tools/list", json!({})).await;
    response["result"]["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

/// Text of the first content block of a `tools/call` result.
pub fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
}
