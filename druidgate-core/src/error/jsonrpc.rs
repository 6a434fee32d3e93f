//! Wire shape of the `error` member in JSON-RPC responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

/// Client-visible context for an error. Never carries Druid response
/// bodies or credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ErrorData {
    pub correlation_id: String,

    /// `"invocation"` or `"transport"` for read-only denials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Stable snake_case name, e.g. `read_only_mode`
    pub error_type: String,
}
