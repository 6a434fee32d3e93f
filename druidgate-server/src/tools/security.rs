//! Basic-security authenticator users.

use druidgate_core::engine::{DruidApi, paths};
use druidgate_core::error::Result;
use druidgate_core::protocol::ToolOutput;
use serde_json::json;

use super::Args;

pub(super) const DEFAULT_AUTHENTICATOR: &str = "basic";

fn authenticator<'a>(args: &Args<'a>) -> Result<&'a str> {
    Ok(args
        .optional_str("authenticator")?
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_AUTHENTICATOR))
}

pub(super) async fn list_users(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let path = paths::join(paths::BASIC_SECURITY, &[authenticator(args)?, "users"]);
    engine.get(&path).await.map(ToolOutput::Text)
}

/// Creates the user, then sets its password when one is given.
pub(super) async fn create_user(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let authn = authenticator(args)?;
    let username = args.required_str("username")?;
    let password = args.optional_str("password")?;

    let path = paths::join(paths::BASIC_SECURITY, &[authn, "users", username]);
    engine.post_empty(&path).await?;

    if let Some(password) = password {
        let path = paths::join(
            paths::BASIC_SECURITY,
            &[authn, "users", username, "credentials"],
        );
        let body = json!({ "password": password });
        engine.post_json(&path, &body).await?;
        return Ok(ToolOutput::Text(format!(
            "User '{username}' created in authenticator '{authn}' with credentials"
        )));
    }

    Ok(ToolOutput::Text(format!(
        "User '{username}' created in authenticator '{authn}'"
    )))
}

pub(super) async fn delete_user(engine: &dyn DruidApi, args: &Args<'_>) -> Result<ToolOutput> {
    let authn = authenticator(args)?;
    let username = args.required_str("username")?;

    let path = paths::join(paths::BASIC_SECURITY, &[authn, "users", username]);
    engine.delete(&path).await?;
    Ok(ToolOutput::Text(format!(
        "User '{username}' deleted from authenticator '{authn}'"
    )))
}
