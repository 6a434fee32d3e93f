//! MCP request handler.
//!
//! # Request Flow
//!
//! 1. Receive buffered request body (the router enforces the size limit)
//! 2. Parse JSON-RPC request(s)
//! 3. Route each request by method
//! 4. `tools/list` goes through the discovery filter, `tools/call` through
//!    the invocation guard
//! 5. Return JSON-RPC response(s); notifications get HTTP 202 with no body

mod helpers;
mod tool_methods;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use serde_json::{Value, json};
use tracing::{debug, error};

use druidgate_core::engine::DruidApi;
use druidgate_core::error::DruidGateError;
use druidgate_core::jsonrpc::{
    BatchItem, JsonRpcResponse, McpRequest, ParsedRequests, fast_correlation_id, parse_jsonrpc,
};
use druidgate_core::policy::{DiscoveryFilter, InvocationGuard, OperationClassifier, PolicyState};
use druidgate_core::protocol::{PROTOCOL_VERSION, methods};

use crate::metrics::DruidGateMetrics;
use helpers::{INTERNAL_ERROR_BODY, error_bytes, extract_tool_name, json_bytes};

/// Cap on batch items processed concurrently.
const BATCH_CONCURRENCY: usize = 16;

/// Shared MCP handler state.
pub struct McpState {
    /// Druid router client
    pub engine: Arc<dyn DruidApi>,
    pub classifier: OperationClassifier,
    pub invocation: InvocationGuard,
    pub discovery: DiscoveryFilter,
    /// Tools per `tools/list` page
    pub page_size: usize,
    pub metrics: Option<Arc<DruidGateMetrics>>,
}

impl McpState {
    fn record_tool_call(&self, tool: &str, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_tool_call(tool, outcome);
        }
    }
}

/// Cheap-to-clone handle used as axum state.
#[derive(Clone)]
pub struct McpHandler {
    state: Arc<McpState>,
}

impl McpHandler {
    /// Build a handler whose guards all share `policy`.
    pub fn new(engine: Arc<dyn DruidApi>, policy: PolicyState, page_size: usize) -> Self {
        let classifier = OperationClassifier::new();
        Self {
            state: Arc::new(McpState {
                engine,
                classifier,
                invocation: InvocationGuard::new(policy, classifier),
                discovery: DiscoveryFilter::new(policy, classifier),
                page_size: page_size.max(1),
                metrics: None,
            }),
        }
    }

    pub fn with_metrics(self, metrics: Arc<DruidGateMetrics>) -> Self {
        let state = &self.state;
        Self {
            state: Arc::new(McpState {
                engine: Arc::clone(&state.engine),
                classifier: state.classifier,
                invocation: state.invocation,
                discovery: state.discovery,
                page_size: state.page_size,
                metrics: Some(metrics),
            }),
        }
    }

    pub fn state(&self) -> &Arc<McpState> {
        &self.state
    }

    /// Process one buffered body.
    pub async fn handle(&self, body: Bytes) -> (StatusCode, Bytes) {
        let parsed = match parse_jsonrpc(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                let correlation_id = fast_correlation_id().to_string();
                return error_bytes(None, &e, &correlation_id);
            }
        };

        match parsed {
            ParsedRequests::Single(request) => handle_single_request(&self.state, request).await,
            ParsedRequests::Batch(items) => handle_batch_request(&self.state, items).await,
        }
    }
}

/// `POST /mcp`.
pub async fn handle_mcp_request(State(handler): State<McpHandler>, body: Bytes) -> Response {
    let (status, bytes) = handler.handle(body).await;
    if bytes.is_empty() {
        return status.into_response();
    }
    (status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response()
}

async fn handle_single_request(state: &McpState, request: McpRequest) -> (StatusCode, Bytes) {
    let correlation_id = request.correlation_id.to_string();
    let id = request.id.clone();
    let is_notification = request.is_notification();

    debug!(
        correlation_id = %correlation_id,
        method = %request.method,
        tool = extract_tool_name(&request),
        is_notification,
        "Processing single request"
    );

    let result = route_request(state, &request).await;

    if is_notification {
        if let Err(e) = result {
            error!(
                correlation_id = %correlation_id,
                error = %e,
                "Notification processing failed"
            );
        }
        return (StatusCode::ACCEPTED, Bytes::new());
    }

    match result {
        Ok(value) => json_bytes(&JsonRpcResponse::success(id, value)),
        Err(e) => error_bytes(id, &e, &correlation_id),
    }
}

/// Items run concurrently; JSON-RPC clients match batch responses by `id`.
async fn handle_batch_request(state: &McpState, items: Vec<BatchItem>) -> (StatusCode, Bytes) {
    let concurrency = items.len().clamp(1, BATCH_CONCURRENCY);

    let responses: Vec<Option<JsonRpcResponse>> = stream::iter(items)
        .map(|item| async move {
            match item {
                BatchItem::Invalid { id, error } => {
                    let correlation_id = fast_correlation_id().to_string();
                    Some(JsonRpcResponse::error(
                        id,
                        error.to_jsonrpc_error(&correlation_id),
                    ))
                }
                BatchItem::Valid(request) => {
                    let result = route_request(state, &request).await;
                    if request.is_notification() {
                        if let Err(e) = result {
                            error!(
                                correlation_id = %request.correlation_id,
                                error = %e,
                                "Notification in batch failed"
                            );
                        }
                        return None;
                    }
                    let id = request.id.clone();
                    Some(match result {
                        Ok(value) => JsonRpcResponse::success(id, value),
                        Err(e) => JsonRpcResponse::error(
                            id,
                            e.to_jsonrpc_error(&request.correlation_id.to_string()),
                        ),
                    })
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let responses: Vec<JsonRpcResponse> = responses.into_iter().flatten().collect();
    if responses.is_empty() {
        return (StatusCode::ACCEPTED, Bytes::new());
    }

    match serde_json::to_vec(&responses) {
        Ok(bytes) => (StatusCode::OK, Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, "Failed to serialize batch response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(INTERNAL_ERROR_BODY),
            )
        }
    }
}

async fn route_request(state: &McpState, request: &McpRequest) -> Result<Value, DruidGateError> {
    match request.method.as_str() {
        methods::INITIALIZE => Ok(initialize_result(state)),
        methods::PING => Ok(json!({})),
        methods::TOOLS_LIST => tool_methods::handle_tools_list(state, request),
        methods::TOOLS_CALL => tool_methods::handle_tools_call(state, request).await,
        method if request.is_notification() && method.starts_with("notifications/") => {
            Ok(Value::Null)
        }
        method => Err(DruidGateError::MethodNotFound {
            method: method.to_string(),
        }),
    }
}

fn initialize_result(state: &McpState) -> Value {
    let read_only = state.invocation.state().is_enabled();
    let instructions = if read_only {
        state.classifier.allowed_tools_hint()
    } else {
        "Tools for managing an Apache Druid cluster."
    };
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": instructions
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use druidgate_core::engine::EngineResponse;
    use http::Method;
    use std::sync::Mutex;

    /// Records every engine request and answers `[]`.
    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<(Method, String)>>,
    }

    impl RecordingEngine {
        fn calls(&self) -> Vec<(Method, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DruidApi for RecordingEngine {
        async fn send(
            &self,
            method: Method,
            path_and_query: &str,
            _body: Option<Bytes>,
        ) -> Result<EngineResponse, DruidGateError> {
            self.calls
                .lock()
                .unwrap()
                .push((method, path_and_query.to_string()));
            Ok(EngineResponse {
                status: 200,
                content_type: Some("application/json".to_string()),
                body: Bytes::from_static(b"[]"),
            })
        }
    }

    /// Fails every request the way an unreachable router would.
    struct DownEngine;

    #[async_trait]
    impl DruidApi for DownEngine {
        async fn send(
            &self,
            _method: Method,
            _path_and_query: &str,
            _body: Option<Bytes>,
        ) -> Result<EngineResponse, DruidGateError> {
            Err(DruidGateError::EngineConnectionFailed {
                url: "http://druid:8888".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn handler(engine: Arc<dyn DruidApi>, read_only: bool) -> McpHandler {
        McpHandler::new(engine, PolicyState::new(read_only), 50)
    }

    async fn call(handler: &McpHandler, body: Value) -> (StatusCode, Value) {
        let (status, bytes) = handler.handle(Bytes::from(body.to_string())).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        })
    }

    #[tokio::test]
    async fn test_initialize() {
        let h = handler(Arc::new(RecordingEngine::default()), true);
        let (status, body) = call(
            &h,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(body["result"]["capabilities"]["tools"].is_object());
        assert!(
            body["result"]["instructions"]
                .as_str()
                .unwrap()
                .contains("Read-only mode")
        );
    }

    #[tokio::test]
    async fn test_notification_accepted_without_body() {
        let h = handler(Arc::new(RecordingEngine::default()), false);
        let (status, body) = call(
            &h,
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let h = handler(Arc::new(RecordingEngine::default()), false);
        let (_, body) = call(
            &h,
            json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"}),
        )
        .await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let h = handler(Arc::new(RecordingEngine::default()), false);
        let (status, bytes) = h.handle(Bytes::from_static(b"{not json")).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["error"]["data"]["correlation_id"].is_string());
    }

    #[tokio::test]
    async fn test_tools_list_read_only_hides_mutating_tools() {
        let h = handler(Arc::new(RecordingEngine::default()), true);
        let (_, body) = call(
            &h,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
        )
        .await;

        let names: Vec<&str> = body["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 11);
        assert!(names.contains(&"queryDruidSql"));
        assert!(names.contains(&"taskStatusById"));
        assert!(!names.contains(&"killTask"));
        assert!(!names.contains(&"deleteLookup"));
    }

    #[tokio::test]
    async fn test_tools_list_pagination_keeps_cursor() {
        let h = McpHandler::new(
            Arc::new(RecordingEngine::default()),
            PolicyState::enabled(),
            3,
        );

        // listDatasources, showDatasourceDetails, deleteDatasource
        let (_, first) = call(
            &h,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
        )
        .await;
        assert_eq!(first["result"]["tools"].as_array().unwrap().len(), 2);
        assert_eq!(first["result"]["nextCursor"], "3");

        let (_, last) = call(
            &h,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list", "params": {"cursor": "18"}}),
        )
        .await;
        assert_eq!(last["result"]["tools"].as_array().unwrap().len(), 2);
        assert!(last["result"].get("nextCursor").is_none());
    }

    #[tokio::test]
    async fn test_tools_list_invalid_cursor() {
        let h = handler(Arc::new(RecordingEngine::default()), false);
        let (_, body) = call(
            &h,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {"cursor": "abc"}}),
        )
        .await;
        assert_eq!(body["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_tools_list_cursor_past_the_catalog_is_rejected_in_read_only_mode() {
        let h = handler(Arc::new(RecordingEngine::default()), true);
        let (_, body) = call(
            &h,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {"cursor": "99"}}),
        )
        .await;
        assert_eq!(body["error"]["code"], -32602);
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn test_read_only_text_tool_denial_is_a_result() {
        let engine = Arc::new(RecordingEngine::default());
        let h = handler(engine.clone(), true);

        let args = json!({"username": "mallory"});
        let (_, body) = call(&h, tool_call(1, "createAuthenticationUser", args)).await;

        let text = body["result"]["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["error"], "read_only_mode");
        assert!(payload["allowedToolsHint"].is_string());
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_structured_tool_denial_is_an_error() {
        let engine = Arc::new(RecordingEngine::default());
        let h = handler(engine.clone(), true);

        let args = json!({"tier": "__default", "name": "country"});
        let (_, body) = call(&h, tool_call(2, "deleteLookup", args)).await;

        assert_eq!(body["error"]["code"], -32003);
        assert_eq!(body["error"]["data"]["error_type"], "read_only_mode");
        assert_eq!(body["error"]["data"]["tool"], "deleteLookup");
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_allows_read_tools() {
        let engine = Arc::new(RecordingEngine::default());
        let h = handler(engine.clone(), true);

        let (_, body) = call(&h, tool_call(3, "listDatasources", json!({}))).await;

        assert_eq!(body["result"]["content"][0]["text"], "[]");
        assert_eq!(body["result"]["isError"], false);
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Method::GET);
        assert_eq!(calls[0].1, "/druid/coordinator/v1/datasources");
    }

    #[tokio::test]
    async fn test_disabled_mode_runs_mutating_tools() {
        let engine = Arc::new(RecordingEngine::default());
        let h = handler(engine.clone(), false);

        let (_, body) = call(&h, tool_call(4, "killTask", json!({"taskId": "index_1"}))).await;

        assert!(body["result"].is_object());
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Method::POST);
        assert_eq!(calls[0].1, "/druid/indexer/v1/task/index_1/shutdown");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let h = handler(Arc::new(RecordingEngine::default()), false);
        let (_, body) = call(&h, tool_call(5, "dropEverything", json!({}))).await;
        assert_eq!(body["error"]["code"], -32602);
        assert_eq!(body["error"]["data"]["error_type"], "tool_not_found");
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let h = handler(Arc::new(RecordingEngine::default()), false);
        let (_, body) = call(&h, tool_call(6, "showDatasourceDetails", json!({}))).await;
        assert_eq!(body["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_engine_failure_is_an_error_result() {
        let h = handler(Arc::new(DownEngine), false);
        let (_, body) = call(&h, tool_call(7, "listTasks", json!({}))).await;

        assert_eq!(body["result"]["isError"], true);
        let text = body["result"]["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["error"], "engine_connection_failed");
    }

    #[tokio::test]
    async fn test_batch_mixed() {
        let h = handler(Arc::new(RecordingEngine::default()), true);
        let (status, body) = call(
            &h,
            json!([
                {"jsonrpc": "2.0", "id": 1, "method": "ping"},
                {"jsonrpc": "2.0", "method": "notifications/initialized"},
                {"jsonrpc": "1.0", "id": 2, "method": "ping"},
                {"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                 "params": {"name": "terminateSupervisor", "arguments": {"supervisorId": "s"}}}
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let responses = body.as_array().unwrap();
        assert_eq!(responses.len(), 3);

        let by_id = |id: u64| {
            responses
                .iter()
                .find(|r| r["id"] == id)
                .unwrap_or_else(|| panic!("missing response {id}"))
        };
        assert_eq!(by_id(1)["result"], json!({}));
        assert_eq!(by_id(2)["error"]["code"], -32600);
        assert_eq!(by_id(3)["error"]["code"], -32003);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let h = handler(Arc::new(RecordingEngine::default()), false);
        let (_, body) = call(&h, json!([])).await;
        assert_eq!(body["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_metrics_record_denials() {
        let mut registry = prometheus_client::registry::Registry::default();
        let metrics = Arc::new(DruidGateMetrics::new(&mut registry));
        let h = handler(Arc::new(RecordingEngine::default()), true).with_metrics(metrics);

        let args = json!({"datasource": "wiki"});
        call(&h, tool_call(1, "deleteDatasource", args)).await;

        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &registry).unwrap();
        assert!(buffer.contains(r#"tool="deleteDatasource""#));
        assert!(buffer.contains(r#"outcome="denied""#));
    }
}
