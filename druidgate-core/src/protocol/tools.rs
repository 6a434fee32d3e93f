//! MCP tool types: definitions, listing, calls and results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a tool hands its result back to the caller.
///
/// Text tools return a string (JSON rendered as text), and a read-only denial
/// is delivered to them as a string payload. Structured tools return JSON, and
/// a denial is raised as an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    Text,
    Structured,
}

/// Identity of a tool call as seen by the invocation guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: String,
    pub return_kind: ReturnKind,
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, return_kind: ReturnKind) -> Self {
        Self {
            name: name.into(),
            return_kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ReturnKind::Text)
    }

    pub fn structured(name: impl Into<String>) -> Self {
        Self::new(name, ReturnKind::Structured)
    }
}

/// Raw result of a tool handler, before it is wrapped into a [`CallToolResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Structured(Value),
}

impl ToolOutput {
    pub fn return_kind(&self) -> ReturnKind {
        match self {
            Self::Text(_) => ReturnKind::Text,
            Self::Structured(_) => ReturnKind::Structured,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

/// MCP behavior hints attached to a tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

/// MCP tool definition as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// The tool name (unique identifier)
    pub name: String,

    /// Human-readable description of the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the tool's input parameters
    pub input_schema: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Parameters of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsRequest {
    /// Cursor for pagination (opaque string from a previous response).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<ToolDefinition>,

    /// Cursor for the next page, if more results exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ListToolsResult {
    #[must_use]
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            tools,
            next_cursor: None,
        }
    }

    /// Sets the next page cursor.
    #[must_use]
    pub fn with_next_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(cursor.into());
        self
    }

    /// Returns true if there are more pages.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,

    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            structured_content: None,
            is_error: false,
        }
    }

    /// Structured results also carry their JSON as text for clients that
    /// only read `content`.
    pub fn structured(value: Value) -> Self {
        Self {
            content: vec![Content::Text {
                text: value.to_string(),
            }],
            structured_content: Some(value),
            is_error: false,
        }
    }

    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .map(|Content::Text { text }| text.as_str())
            .next()
    }
}

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        match output {
            ToolOutput::Text(text) => Self::text(text),
            ToolOutput::Structured(value) => Self::structured(value),
        }
    }
}
