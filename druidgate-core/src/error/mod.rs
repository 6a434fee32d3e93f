//! Error handling for druidgate.
//!
//! This module defines the errors that surface to MCP clients and provides
//! JSON-RPC 2.0 compliant error response formatting.
//!
//! ## Module Organization
//!
//! - `jsonrpc` - JSON-RPC 2.0 error response structures
//! - `DruidGateError` - MCP/JSON-RPC error types

pub mod jsonrpc;

use jsonrpc::{ErrorData, JsonRpcError};
use thiserror::Error;

use crate::policy::TransportDenied;

/// Result type for operations that can reach an MCP client.
pub type Result<T> = std::result::Result<T, DruidGateError>;

/// All error types that can reach an MCP client.
///
/// Each variant maps to a specific JSON-RPC error code and provides
/// structured error information for clients.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DruidGateError {
    // Protocol errors
    /// Invalid JSON in request body.
    #[error("Invalid JSON: {details}")]
    ParseError {
        /// Description of the parse error
        details: String,
    },

    /// Request is not a valid JSON-RPC 2.0 message.
    #[error("Invalid JSON-RPC request: {details}")]
    InvalidRequest {
        /// Description of what makes the request invalid
        details: String,
    },

    /// The requested method does not exist.
    #[error("Method '{method}' not found")]
    MethodNotFound {
        /// The method name that was not found
        method: String,
    },

    /// The method parameters are invalid.
    #[error("Invalid parameters: {details}")]
    InvalidParams {
        /// Description of the parameter problem
        details: String,
    },

    /// `tools/call` named a tool that is not registered.
    #[error("Unknown tool '{tool}'")]
    ToolNotFound { tool: String },

    // Engine errors
    /// Could not connect to the Druid router.
    #[error("Failed to connect to Druid at {url}: {reason}")]
    EngineConnectionFailed { url: String, reason: String },

    /// The Druid router did not answer in time.
    #[error("Druid request timed out after {timeout_secs}s")]
    EngineTimeout { timeout_secs: u64 },

    /// The Druid router answered with a non-success status.
    #[error("Druid returned HTTP {status}: {message}")]
    EngineError {
        /// HTTP status code from the engine
        status: u16,
        /// Short classification of the failure
        message: String,
    },

    // Read-only policy errors
    /// A mutating tool was invoked while read-only mode is enabled.
    #[error("Operation '{tool}' is blocked: {reason}")]
    ReadOnlyDenied { tool: String, reason: String },

    /// A raw HTTP request was rejected by the transport guard.
    #[error("{message}")]
    TransportDenied {
        /// HTTP status carried by the denial (always 405)
        status: u16,
        /// Full denial message including the allowed methods
        message: String,
    },

    /// Server is not ready to accept requests.
    #[error("Service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    /// Unexpected internal failure.
    #[error("Internal error (correlation ID: {correlation_id})")]
    InternalError { correlation_id: String },
}

impl DruidGateError {
    /// Maps error to JSON-RPC 2.0 error code.
    ///
    /// Standard JSON-RPC codes (-32700 to -32603) are used for protocol errors.
    /// druidgate custom codes start at -32000.
    pub fn to_jsonrpc_code(&self) -> i32 {
        match self {
            // Standard JSON-RPC codes
            Self::ParseError { .. } => -32700,
            Self::InvalidRequest { .. } => -32600,
            Self::MethodNotFound { .. } => -32601,
            Self::InvalidParams { .. } | Self::ToolNotFound { .. } => -32602,
            Self::InternalError { .. } => -32603,

            // druidgate custom codes
            Self::EngineConnectionFailed { .. } => -32000,
            Self::EngineTimeout { .. } => -32001,
            Self::EngineError { .. } => -32002,
            Self::ReadOnlyDenied { .. } => -32003,
            Self::TransportDenied { .. } => -32004,
            Self::ServiceUnavailable { .. } => -32005,
        }
    }

    /// Returns the error type name for metrics and logging.
    pub fn error_type_name(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "parse_error",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::InvalidParams { .. } => "invalid_params",
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::EngineConnectionFailed { .. } => "engine_connection_failed",
            Self::EngineTimeout { .. } => "engine_timeout",
            Self::EngineError { .. } => "engine_error",
            Self::ReadOnlyDenied { .. } => "read_only_mode",
            Self::TransportDenied { .. } => "method_not_allowed",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::InternalError { .. } => "internal_error",
        }
    }

    /// Which interception point produced this error, if any.
    pub fn gate(&self) -> Option<&'static str> {
        match self {
            Self::ReadOnlyDenied { .. } => Some("invocation"),
            Self::TransportDenied { .. } => Some("transport"),
            _ => None,
        }
    }

    /// HTTP status to use when this error is answered outside JSON-RPC.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ParseError { .. }
            | Self::InvalidRequest { .. }
            | Self::InvalidParams { .. }
            | Self::ToolNotFound { .. } => 400,
            Self::MethodNotFound { .. } => 404,
            Self::TransportDenied { status, .. } => *status,
            Self::ReadOnlyDenied { .. } => 403,
            Self::EngineConnectionFailed { .. } | Self::EngineError { .. } => 502,
            Self::EngineTimeout { .. } => 504,
            Self::ServiceUnavailable { .. } => 503,
            Self::InternalError { .. } => 500,
        }
    }

    /// Returns safe details for client consumption (no sensitive data).
    pub fn safe_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::MethodNotFound { method } => Some(serde_json::json!({ "method": method })),
            Self::ReadOnlyDenied { reason, .. } => Some(serde_json::json!({ "reason": reason })),
            Self::EngineError { status, .. } => {
                // Engine bodies may echo internal hostnames or SQL
                Some(serde_json::json!({ "engine_status": status }))
            }
            _ => None,
        }
    }

    fn tool(&self) -> Option<String> {
        match self {
            Self::ToolNotFound { tool } | Self::ReadOnlyDenied { tool, .. } => Some(tool.clone()),
            _ => None,
        }
    }

    /// Converts error to JSON-RPC error object.
    pub fn to_jsonrpc_error(&self, correlation_id: &str) -> JsonRpcError {
        JsonRpcError {
            code: self.to_jsonrpc_code(),
            message: self.to_string(),
            data: Some(ErrorData {
                correlation_id: correlation_id.to_string(),
                gate: self.gate().map(str::to_string),
                tool: self.tool(),
                details: self.safe_details(),
                error_type: self.error_type_name().to_string(),
            }),
        }
    }
}

impl From<TransportDenied> for DruidGateError {
    fn from(denied: TransportDenied) -> Self {
        Self::TransportDenied {
            status: denied.status(),
            message: denied.to_string(),
        }
    }
}
