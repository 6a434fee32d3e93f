//! Coordinator lookup configuration.

use druidgate_core::engine::{DruidApi, paths};
use druidgate_core::error::Result;
use druidgate_core::protocol::ToolOutput;
use serde_json::json;

use super::Args;

pub(super) async fn list(engine: &dyn DruidApi) -> Result<ToolOutput> {
    let path = paths::join(paths::LOOKUPS_CONFIG, &["all"]);
    engine.get(&path).await.map(ToolOutput::Text)
}

pub(super) async fn create_or_update(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let tier = args.required_str("tier")?;
    let name = args.required_str("name")?;
    let spec = args.required_object("spec")?;

    let path = paths::join(paths::LOOKUPS_CONFIG, &[tier, name]);
    let body = engine.post_json(&path, spec).await?;
    Ok(ToolOutput::Text(if body.trim().is_empty() {
        format!("Lookup '{name}' saved in tier '{tier}'")
    } else {
        body
    }))
}

/// Druid answers 202 with an empty body; the result echoes what was removed.
pub(super) async fn delete(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let tier = args.required_str("tier")?;
    let name = args.required_str("name")?;

    let path = paths::join(paths::LOOKUPS_CONFIG, &[tier, name]);
    engine.delete(&path).await?;
    Ok(ToolOutput::Structured(json!({
        "tier": tier,
        "name": name,
        "deleted": true
    })))
}
