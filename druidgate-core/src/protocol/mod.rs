//! MCP protocol types served by druidgate.
//!
//! Only the `tools` capability is offered; method names are listed in
//! [`methods`].

pub mod tools;

pub use tools::{
    CallToolRequest, CallToolResult, Content, ListToolsRequest, ListToolsResult,
    OperationDescriptor, ReturnKind, ToolAnnotations, ToolDefinition, ToolOutput,
};

/// MCP protocol revision announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// JSON-RPC method names handled by the MCP endpoint.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}
