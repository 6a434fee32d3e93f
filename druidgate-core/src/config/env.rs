//! Environment overrides applied on top of the YAML file.
//!
//! # Environment Variables
//! - `DRUIDGATE_DRUID_URL`
//! - `DRUIDGATE_DRUID_USERNAME`
//! - `DRUIDGATE_DRUID_PASSWORD`
//! - `DRUIDGATE_DRUID_TIMEOUT_SECS`
//! - `DRUIDGATE_READ_ONLY` (`true`/`false`, `1`/`0`, `yes`/`no`)
//! - `DRUIDGATE_BIND`
//! - `DRUIDGATE_PORT`
//! - `DRUIDGATE_ADMIN_PORT`
//! - `DRUIDGATE_MAX_BODY_SIZE`
//! - `DRUIDGATE_TOOLS_PAGE_SIZE`
//!
//! Unparseable values are logged and ignored; the file value stays in effect.

use std::time::Duration;
use tracing::warn;

use super::schema::Config;

pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(url) = std::env::var("DRUIDGATE_DRUID_URL") {
        config.druid.url = url;
    }
    if let Ok(username) = std::env::var("DRUIDGATE_DRUID_USERNAME") {
        config.druid.username = Some(username);
    }
    if let Ok(password) = std::env::var("DRUIDGATE_DRUID_PASSWORD") {
        config.druid.password = Some(password);
    }
    config.druid.timeout = Duration::from_secs(parse_env_warn(
        "DRUIDGATE_DRUID_TIMEOUT_SECS",
        config.druid.timeout.as_secs(),
    ));

    if let Ok(val) = std::env::var("DRUIDGATE_READ_ONLY") {
        match parse_flag(&val) {
            Some(enabled) => config.read_only.enabled = enabled,
            None => warn!(
                env_var = "DRUIDGATE_READ_ONLY",
                value = %val,
                current = config.read_only.enabled,
                "Invalid value for environment variable, keeping current setting"
            ),
        }
    }

    if let Ok(bind) = std::env::var("DRUIDGATE_BIND") {
        config.server.bind = bind;
    }
    config.server.port = parse_env_warn("DRUIDGATE_PORT", config.server.port);
    config.server.admin_port = parse_env_warn("DRUIDGATE_ADMIN_PORT", config.server.admin_port);
    config.server.max_body_size =
        parse_env_warn("DRUIDGATE_MAX_BODY_SIZE", config.server.max_body_size);
    config.server.tools_page_size =
        parse_env_warn("DRUIDGATE_TOOLS_PAGE_SIZE", config.server.tools_page_size);
}

/// Parse an environment variable with a warning on invalid values.
pub fn parse_env_warn<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(val) => match val.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    env_var = name,
                    value = %val,
                    default = %default,
                    "Invalid value for environment variable, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
