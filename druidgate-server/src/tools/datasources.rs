//! Coordinator datasource endpoints.

use druidgate_core::engine::{DruidApi, paths};
use druidgate_core::error::Result;
use druidgate_core::protocol::ToolOutput;

use super::Args;

pub(super) async fn list(engine: &dyn DruidApi) -> Result<ToolOutput> {
    engine.get(paths::DATASOURCES).await.map(ToolOutput::Text)
}

pub(super) async fn show(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let datasource = args.required_str("datasource")?;
    let path = paths::join(paths::DATASOURCES, &[datasource]);
    engine.get(&path).await.map(ToolOutput::Text)
}

/// Druid marks every segment unused; data stays in deep storage.
pub(super) async fn delete(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let datasource = args.required_str("datasource")?;
    let path = paths::join(paths::DATASOURCES, &[datasource]);
    let body = engine.delete(&path).await?;
    Ok(ToolOutput::Text(if body.trim().is_empty() {
        format!("Datasource '{datasource}' marked as unused")
    } else {
        body
    }))
}
