//! Druid SQL.

use druidgate_core::engine::{DruidApi, paths};
use druidgate_core::error::{DruidGateError, Result};
use druidgate_core::protocol::ToolOutput;
use serde_json::{Map, Value};

use super::Args;

pub(super) const RESULT_FORMATS: &[&str] = &["object", "array", "objectLines", "arrayLines", "csv"];

pub(super) async fn query(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let body = request_body(args)?;
    let rows = engine.post_json(paths::SQL, &body).await?;
    Ok(ToolOutput::Text(rows))
}

fn request_body(args: &Args<'_>) -> Result<Value> {
    let query = args.required_str("query")?;
    let format = args.optional_str("resultFormat")?.unwrap_or("object");
    if !RESULT_FORMATS.contains(&format) {
        return Err(DruidGateError::InvalidParams {
            details: format!(
                "unsupported resultFormat '{format}', expected one of {}",
                RESULT_FORMATS.join(", ")
            ),
        });
    }

    let mut body = Map::new();
    body.insert("query".to_string(), Value::from(query));
    body.insert("resultFormat".to_string(), Value::from(format));
    if let Some(context) = args.optional_object("context")? {
        body.insert("context".to_string(), context.clone());
    }
    Ok(Value::Object(body))
}
