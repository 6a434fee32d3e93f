//! Overlord task endpoints.

use druidgate_core::engine::{DruidApi, paths};
use druidgate_core::error::{DruidGateError, Result};
use druidgate_core::protocol::ToolOutput;

use super::Args;

pub(super) const TASK_STATES: &[&str] = &["running", "complete", "waiting", "pending"];

pub(super) async fn list(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let path = list_path(args)?;
    engine.get(&path).await.map(ToolOutput::Text)
}

fn list_path(args: &Args<'_>) -> Result<String> {
    let state = args.optional_str("state")?;
    if let Some(state) = state.filter(|s| !TASK_STATES.contains(s)) {
        return Err(DruidGateError::InvalidParams {
            details: format!(
                "unsupported task state '{state}', expected one of {}",
                TASK_STATES.join(", ")
            ),
        });
    }
    let datasource = args.optional_str("datasource")?;

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(state) = state {
        query.append_pair("state", state);
    }
    if let Some(datasource) = datasource {
        query.append_pair("datasource", datasource);
    }
    let query = query.finish();

    Ok(if query.is_empty() {
        paths::TASKS.to_string()
    } else {
        format!("{}?{query}", paths::TASKS)
    })
}

pub(super) async fn status(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let task_id = args.required_str("taskId")?;
    let path = paths::join(paths::TASK, &[task_id, "status"]);
    engine.get(&path).await.map(ToolOutput::Text)
}

pub(super) async fn kill(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let task_id = args.required_str("taskId")?;
    let path = paths::join(paths::TASK, &[task_id, "shutdown"]);
    engine.post_empty(&path).await.map(ToolOutput::Text)
}
