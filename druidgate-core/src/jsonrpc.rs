//! JSON-RPC 2.0 framing for `POST /mcp`.
//!
//! A body is one request object or a non-empty array of them. An object
//! without `id` is a notification. Ids are echoed back with their original
//! type. Size limits live in the HTTP layer, not here.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use uuid::Uuid;

use crate::error::DruidGateError;
use crate::error::jsonrpc::JsonRpcError;

const JSONRPC_VERSION: &str = "2.0";

/// Process-unique upper half, drawn once from the CSPRNG.
static CORRELATION_PREFIX: LazyLock<u64> =
    LazyLock::new(|| (Uuid::new_v4().as_u128() >> 64) as u64);

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Counter-based v4-shaped UUID for request correlation.
pub fn fast_correlation_id() -> Uuid {
    let prefix = *CORRELATION_PREFIX;
    let counter = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut combined = ((prefix as u128) << 64) | (counter as u128);
    // version 4
    combined = (combined & !(0xF_u128 << 76)) | (0x4_u128 << 76);
    // RFC 4122 variant
    combined = (combined & !(0x3_u128 << 62)) | (0x2_u128 << 62);
    Uuid::from_u128(combined)
}

/// JSON-RPC 2.0 request ID. Never coerced between types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
    /// Explicit `"id": null`; distinct from a missing id (notification).
    Null,
}

impl Serialize for JsonRpcId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonRpcId::Number(n) => serializer.serialize_i64(*n),
            JsonRpcId::String(s) => serializer.serialize_str(s),
            JsonRpcId::Null => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for JsonRpcId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonRpcId::from_value(&Value::deserialize(deserializer)?)
            .ok_or_else(|| serde::de::Error::custom("JSON-RPC ID must be string, integer, or null"))
    }
}

impl JsonRpcId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(JsonRpcId::Number),
            Value::String(s) => Some(JsonRpcId::String(s.clone())),
            Value::Null => Some(JsonRpcId::Null),
            _ => None,
        }
    }
}

/// `Some(Null)` for an explicit null, `None` for an absent field.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<JsonRpcId>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonRpcId::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct RawJsonRpcRequest {
    jsonrpc: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<JsonRpcId>,
    method: Option<String>,
    params: Option<Value>,
}

/// Parsed and validated MCP request.
#[derive(Clone)]
pub struct McpRequest {
    /// Original JSON-RPC ID (None for notifications)
    pub id: Option<JsonRpcId>,
    pub method: String,
    pub params: Option<Value>,
    pub received_at: Instant,
    pub correlation_id: Uuid,
}

/// Params are redacted: tool arguments may carry SQL or credentials.
impl std::fmt::Debug for McpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpRequest")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("params", &self.params.as_ref().map(|_| "<redacted>"))
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

impl McpRequest {
    #[inline]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response. `id: None` serializes as `"id": null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// One element of a batch, valid or not.
#[derive(Debug)]
pub enum BatchItem {
    Valid(McpRequest),
    Invalid {
        /// Recovered from the raw item when it had a usable `id`
        id: Option<JsonRpcId>,
        error: DruidGateError,
    },
}

#[derive(Debug)]
pub enum ParsedRequests {
    Single(McpRequest),
    Batch(Vec<BatchItem>),
}

/// Parse an HTTP body into one request or a batch.
///
/// Malformed JSON yields [`DruidGateError::ParseError`]; well-formed JSON that
/// is not a JSON-RPC request (or an empty batch) yields
/// [`DruidGateError::InvalidRequest`].
pub fn parse_jsonrpc(bytes: &[u8]) -> Result<ParsedRequests, DruidGateError> {
    let first_byte = bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| DruidGateError::ParseError {
            details: "empty input".to_string(),
        })?;

    match first_byte {
        b'{' => {
            let raw: RawJsonRpcRequest = serde_json::from_slice(bytes).map_err(|e| {
                if e.is_syntax() || e.is_eof() {
                    DruidGateError::ParseError {
                        details: e.to_string(),
                    }
                } else {
                    DruidGateError::InvalidRequest {
                        details: format!("not a JSON-RPC request: {e}"),
                    }
                }
            })?;
            Ok(ParsedRequests::Single(validate(raw)?))
        }
        b'[' => {
            let arr: Vec<Value> =
                serde_json::from_slice(bytes).map_err(|e| DruidGateError::ParseError {
                    details: e.to_string(),
                })?;

            if arr.is_empty() {
                return Err(DruidGateError::InvalidRequest {
                    details: "batch must contain at least one request".to_string(),
                });
            }

            let items = arr
                .into_iter()
                .map(|item| {
                    let id = item.get("id").and_then(JsonRpcId::from_value);
                    match parse_value(item) {
                        Ok(request) => BatchItem::Valid(request),
                        Err(error) => BatchItem::Invalid { id, error },
                    }
                })
                .collect();
            Ok(ParsedRequests::Batch(items))
        }
        _ => match serde_json::from_slice::<Value>(bytes) {
            Err(e) => Err(DruidGateError::ParseError {
                details: e.to_string(),
            }),
            Ok(_) => Err(DruidGateError::InvalidRequest {
                details: "body must be a JSON object or array".to_string(),
            }),
        },
    }
}

fn parse_value(value: Value) -> Result<McpRequest, DruidGateError> {
    let raw: RawJsonRpcRequest =
        serde_json::from_value(value).map_err(|e| DruidGateError::InvalidRequest {
            details: format!("not a JSON-RPC request: {e}"),
        })?;
    validate(raw)
}

fn validate(raw: RawJsonRpcRequest) -> Result<McpRequest, DruidGateError> {
    match raw.jsonrpc.as_deref() {
        Some(JSONRPC_VERSION) => {}
        Some(v) => {
            return Err(DruidGateError::InvalidRequest {
                details: format!("unsupported jsonrpc version \"{v}\""),
            });
        }
        None => {
            return Err(DruidGateError::InvalidRequest {
                details: "jsonrpc field is required".to_string(),
            });
        }
    }

    let method = raw.method.ok_or_else(|| DruidGateError::InvalidRequest {
        details: "method field is required".to_string(),
    })?;

    Ok(McpRequest {
        id: raw.id,
        method,
        params: raw.params,
        received_at: Instant::now(),
        correlation_id: fast_correlation_id(),
    })
}
