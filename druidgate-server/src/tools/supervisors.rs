//! Overlord supervisor endpoints.

use druidgate_core::engine::{DruidApi, paths};
use druidgate_core::error::Result;
use druidgate_core::protocol::ToolOutput;

use super::{Args, structured};

pub(super) async fn list(engine: &dyn DruidApi) -> Result<ToolOutput> {
    engine.get(paths::SUPERVISORS).await.map(ToolOutput::Text)
}

pub(super) async fn status(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let path = supervisor_path(args, "status")?;
    engine.get(&path).await.map(ToolOutput::Text)
}

pub(super) async fn suspend(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let path = supervisor_path(args, "suspend")?;
    engine.post_empty(&path).await.map(ToolOutput::Text)
}

pub(super) async fn resume(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let path = supervisor_path(args, "resume")?;
    engine.post_empty(&path).await.map(ToolOutput::Text)
}

pub(super) async fn terminate(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let path = supervisor_path(args, "terminate")?;
    engine.post_empty(&path).await.map(structured)
}

fn supervisor_path(args: &Args<'_>, action: &str) -> Result<String> {
    let id = args.required_str("supervisorId")?;
    Ok(paths::join(paths::SUPERVISORS, &[id, action]))
}
