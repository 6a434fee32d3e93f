//! Tool argument extraction.

use druidgate_core::error::{DruidGateError, Result};
use serde_json::{Map, Value};

/// Borrowed view of a `tools/call` `arguments` object.
pub struct Args<'a> {
    tool: &'static str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    /// `arguments` must be absent, `null` or an object.
    pub fn new(tool: &'static str, raw: Option<&'a Value>) -> Result<Self> {
        let map = match raw {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(DruidGateError::InvalidParams {
                    details: format!("arguments for '{tool}' must be an object"),
                });
            }
        };
        Ok(Self { tool, map })
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key)).filter(|v| !v.is_null())
    }

    /// Non-empty string argument.
    pub fn required_str(&self, key: &str) -> Result<&'a str> {
        match self.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            Some(Value::String(_)) => Err(self.invalid(key, "must not be empty")),
            Some(_) => Err(self.invalid(key, "must be a string")),
            None => Err(DruidGateError::InvalidParams {
                details: format!("missing required argument '{key}' for '{}'", self.tool),
            }),
        }
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.invalid(key, "must be a string")),
            None => Ok(None),
        }
    }

    pub fn required_object(&self, key: &str) -> Result<&'a Value> {
        match self.get(key) {
            Some(v @ Value::Object(_)) => Ok(v),
            Some(_) => Err(self.invalid(key, "must be an object")),
            None => Err(DruidGateError::InvalidParams {
                details: format!("missing required argument '{key}' for '{}'", self.tool),
            }),
        }
    }

    pub fn optional_object(&self, key: &str) -> Result<Option<&'a Value>> {
        match self.get(key) {
            Some(v @ Value::Object(_)) => Ok(Some(v)),
            Some(_) => Err(self.invalid(key, "must be an object")),
            None => Ok(None),
        }
    }

    fn invalid(&self, key: &str, reason: &str) -> DruidGateError {
        DruidGateError::InvalidParams {
            details: format!("argument '{key}' for '{}' {reason}", self.tool),
        }
    }
}
