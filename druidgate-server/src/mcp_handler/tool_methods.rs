//! `tools/list` and `tools/call`.

use serde_json::Value;
use tracing::{debug, info, warn};

use druidgate_core::error::DruidGateError;
use druidgate_core::jsonrpc::McpRequest;
use druidgate_core::policy::{DENIAL_ERROR_CODE, Denial};
use druidgate_core::protocol::{CallToolRequest, CallToolResult, ListToolsRequest, ListToolsResult};

use super::McpState;
use super::helpers::parse_params;
use crate::metrics::outcome;
use crate::tools::DruidTool;

/// One page of the catalog, run through the discovery filter.
pub(super) fn handle_tools_list(
    state: &McpState,
    request: &McpRequest,
) -> Result<Value, DruidGateError> {
    let params: ListToolsRequest = parse_params(request.params.as_ref())?;
    let page = page_at(state, params.cursor.as_deref());
    let listing = state.discovery.filter_result(page)?;
    debug!(
        correlation_id = %request.correlation_id,
        cursor = ?params.cursor,
        visible = listing.tools.len(),
        "Served tools/list page"
    );

    serde_json::to_value(listing).map_err(|e| internal(request, &e))
}

/// The unfiltered page starting at `cursor`, the decimal offset of its first tool.
fn page_at(state: &McpState, cursor: Option<&str>) -> Result<ListToolsResult, DruidGateError> {
    let total = DruidTool::ALL.len();
    let offset = match cursor {
        None => 0,
        Some(cursor) => cursor
            .parse::<usize>()
            .ok()
            .filter(|offset| *offset <= total)
            .ok_or_else(|| DruidGateError::InvalidParams {
                details: format!("invalid cursor '{cursor}'"),
            })?,
    };

    let end = offset.saturating_add(state.page_size).min(total);
    let tools = DruidTool::ALL[offset..end]
        .iter()
        .map(|tool| tool.definition(&state.classifier))
        .collect();

    let page = ListToolsResult::new(tools);
    if end < total {
        return Ok(page.with_next_cursor(end.to_string()));
    }
    Ok(page)
}

/// Resolve, guard and run one tool.
///
/// Engine failures come back as `isError` results so the model can read them;
/// protocol errors and raised denials become JSON-RPC errors.
pub(super) async fn handle_tools_call(
    state: &McpState,
    request: &McpRequest,
) -> Result<Value, DruidGateError> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| DruidGateError::InvalidParams {
            details: "tools/call requires params".to_string(),
        })?;
    let call: CallToolRequest =
        serde_json::from_value(params).map_err(|e| DruidGateError::InvalidParams {
            details: e.to_string(),
        })?;

    let Some(tool) = DruidTool::from_name(&call.name) else {
        state.record_tool_call(&call.name, outcome::ERROR);
        return Err(DruidGateError::ToolNotFound { tool: call.name });
    };

    let descriptor = tool.descriptor();
    let denial = state.invocation.evaluate(&descriptor);
    if let Some(denial) = &denial {
        info!(
            correlation_id = %request.correlation_id,
            tool = tool.name(),
            error_type = DENIAL_ERROR_CODE,
            raised = matches!(denial, Denial::Raised { .. }),
            "Tool call denied in read-only mode"
        );
    }

    let engine = state.engine.as_ref();
    let arguments = call.arguments.as_ref();
    let result = state
        .invocation
        .invoke(&descriptor, || tool.execute(engine, arguments))
        .await;

    match result {
        Ok(output) => {
            let label = if denial.is_some() {
                outcome::DENIED
            } else {
                outcome::SUCCESS
            };
            state.record_tool_call(tool.name(), label);
            serde_json::to_value(CallToolResult::from(output)).map_err(|e| internal(request, &e))
        }
        Err(e @ DruidGateError::ReadOnlyDenied { .. }) => {
            state.record_tool_call(tool.name(), outcome::DENIED);
            Err(e)
        }
        Err(e) if is_engine_failure(&e) => {
            warn!(
                correlation_id = %request.correlation_id,
                tool = tool.name(),
                error = %e,
                "Tool call failed at the engine"
            );
            state.record_tool_call(tool.name(), outcome::ENGINE_ERROR);
            let payload = serde_json::json!({
                "error": e.error_type_name(),
                "message": e.to_string(),
            });
            serde_json::to_value(CallToolResult::error_text(payload.to_string()))
                .map_err(|e| internal(request, &e))
        }
        Err(e) => {
            state.record_tool_call(tool.name(), outcome::ERROR);
            Err(e)
        }
    }
}

fn is_engine_failure(error: &DruidGateError) -> bool {
    matches!(
        error,
        DruidGateError::EngineConnectionFailed { .. }
            | DruidGateError::EngineTimeout { .. }
            | DruidGateError::EngineError { .. }
            | DruidGateError::ServiceUnavailable { .. }
    )
}

fn internal(request: &McpRequest, error: &serde_json::Error) -> DruidGateError {
    warn!(
        correlation_id = %request.correlation_id,
        error = %error,
        "Failed to serialize result"
    );
    DruidGateError::InternalError {
        correlation_id: request.correlation_id.to_string(),
    }
}
