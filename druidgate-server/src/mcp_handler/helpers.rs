//! Small helper functions for MCP request handling.

use axum::http::StatusCode;
use bytes::Bytes;

use druidgate_core::error::DruidGateError;
use druidgate_core::jsonrpc::{JsonRpcId, JsonRpcResponse, McpRequest};
use druidgate_core::protocol::methods;

pub(super) const INTERNAL_ERROR_BODY: &[u8] =
    br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

/// Extract tool name from tools/call request params.
pub(super) fn extract_tool_name(request: &McpRequest) -> Option<&str> {
    if request.method != methods::TOOLS_CALL {
        return None;
    }
    request.params.as_ref()?.get("name")?.as_str()
}

/// Build JSON bytes from a JsonRpcResponse.
pub(super) fn json_bytes(response: &JsonRpcResponse) -> (StatusCode, Bytes) {
    match serde_json::to_vec(response) {
        Ok(bytes) => (StatusCode::OK, Bytes::from(bytes)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(INTERNAL_ERROR_BODY),
        ),
    }
}

/// Build error bytes from a DruidGateError.
///
/// JSON-RPC errors still return HTTP 200.
pub(super) fn error_bytes(
    id: Option<JsonRpcId>,
    error: &DruidGateError,
    correlation_id: &str,
) -> (StatusCode, Bytes) {
    let response = JsonRpcResponse::error(id, error.to_jsonrpc_error(correlation_id));
    match serde_json::to_vec(&response) {
        Ok(bytes) => (StatusCode::OK, Bytes::from(bytes)),
        Err(_) => (StatusCode::OK, Bytes::from_static(INTERNAL_ERROR_BODY)),
    }
}

/// Deserialize optional params, mapping failures to `-32602`.
pub(super) fn parse_params<T>(params: Option<&serde_json::Value>) -> Result<T, DruidGateError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match params {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| DruidGateError::InvalidParams {
                details: e.to_string(),
            })
        }
    }
}
