//! Configuration schema type definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration_format;
use crate::engine::EngineConfig;
use crate::policy::PolicyState;

/// Root configuration structure.
///
/// Every section is optional; a missing file or an empty section yields the
/// defaults below.
///
/// # Example
/// ```yaml
/// schema: 1
///
/// druid:
///   url: http://druid-router:8888
///   username: ${DRUID_USER:-}
///   password: ${DRUID_PASSWORD:-}
///   timeout: 30s
///
/// read_only:
///   enabled: true
///
/// server:
///   port: 8080
///   admin_port: 8081
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Schema version (must be 1).
    #[serde(default = "default_schema")]
    pub schema: u32,

    #[serde(default)]
    pub druid: DruidConfig,

    #[serde(default)]
    pub read_only: ReadOnlyConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            druid: DruidConfig::default(),
            read_only: ReadOnlyConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// The policy switch shared by all guards.
    pub fn policy_state(&self) -> PolicyState {
        PolicyState::new(self.read_only.enabled)
    }
}

fn default_schema() -> u32 {
    1
}

/// Connection to the Druid router.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DruidConfig {
    /// Router base URL.
    #[serde(default = "default_druid_url")]
    pub url: String,

    /// Basic-auth credentials; empty strings count as unset.
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default = "default_timeout", with = "duration_format")]
    pub timeout: Duration,

    #[serde(default = "default_connect_timeout", with = "duration_format")]
    pub connect_timeout: Duration,

    /// Largest Druid response accepted, in bytes.
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
}

impl Default for DruidConfig {
    fn default() -> Self {
        Self {
            url: default_druid_url(),
            username: None,
            password: None,
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            max_response_size: default_max_response_size(),
        }
    }
}

impl DruidConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            router_url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            max_response_size: self.max_response_size,
            ..EngineConfig::default()
        }
    }
}

fn default_druid_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_response_size() -> usize {
    10 * 1024 * 1024
}

/// Read-only mode. Disabled unless explicitly turned on.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReadOnlyConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Listener and MCP endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// MCP endpoint and Druid pass-through.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Health and metrics.
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Tools per `tools/list` page.
    #[serde(default = "default_tools_page_size")]
    pub tools_page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            admin_port: default_admin_port(),
            max_body_size: default_max_body_size(),
            tools_page_size: default_tools_page_size(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_admin_port() -> u16 {
    8081
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_tools_page_size() -> usize {
    50
}
