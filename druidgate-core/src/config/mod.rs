//! Configuration for druidgate.
//!
//! This module provides:
//! - YAML configuration parsing
//! - Environment variable substitution (`${VAR}`, `${VAR:-default}`)
//! - `DRUIDGATE_*` environment overrides
//! - Validation
//!
//! # Example
//!
//! ```ignore
//! use druidgate_core::config;
//!
//! let (config, source) = config::load(None)?;
//! let policy = config.policy_state();
//! ```

mod duration_format;
mod env;
mod error;
mod loader;
mod schema;

pub use env::{apply_env_overrides, parse_env_warn, parse_flag};
pub use error::ConfigError;
pub use loader::{
    default_config_paths, find_config_file, load, load_config, substitute_env_vars, validate,
};
pub use schema::{Config, DruidConfig, ReadOnlyConfig, ServerConfig};
