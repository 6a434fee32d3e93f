//! Router status endpoints.

use druidgate_core::engine::{DruidApi, paths};
use druidgate_core::error::Result;
use druidgate_core::protocol::ToolOutput;

use super::structured;

pub(super) async fn health(engine: &dyn DruidApi) -> Result<ToolOutput> {
    engine.get(paths::HEALTH).await.map(ToolOutput::Text)
}

pub(super) async fn status(engine: &dyn DruidApi) -> Result<ToolOutput> {
    engine.get(paths::STATUS).await.map(structured)
}
