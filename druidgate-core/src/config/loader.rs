//! Configuration loading and validation.
//!
//! Flow: locate file → read → `${VAR}` substitution → YAML parse →
//! environment overrides → normalization → validation. A missing file is not
//! an error unless it was requested explicitly; the defaults apply instead.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

use super::env::apply_env_overrides;
use super::error::ConfigError;
use super::schema::Config;

/// Configuration file search paths (in priority order).
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(path) = std::env::var("DRUIDGATE_CONFIG") {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("/etc/druidgate/config.yaml"));
    paths.push(PathBuf::from("./druidgate.yaml"));

    paths
}

/// Find the config file to load.
///
/// An explicit path must exist. Otherwise the first existing default path
/// wins, and `Ok(None)` means none exists.
pub fn find_config_file(explicit_path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::ConfigFileNotFound {
            searched: vec![path.to_path_buf()],
        });
    }

    Ok(default_config_paths().into_iter().find(|p| p.exists()))
}

/// Load configuration from a file path (no env overrides, no validation).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;

    if contents.trim().is_empty() {
        return Err(ConfigError::EmptyConfigFile);
    }

    let contents = substitute_env_vars(&contents)?;
    let config: Config = serde_saphyr::from_str(&contents)?;

    Ok(config)
}

/// Resolve the effective configuration.
///
/// Returns the config and the file it came from, if any.
pub fn load(explicit_path: Option<&Path>) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let source = find_config_file(explicit_path)?;
    let mut config = match &source {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            load_config(path)?
        }
        None => {
            debug!("No configuration file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config);
    normalize(&mut config);
    validate(&config)?;

    Ok((config, source))
}

/// Empty credentials (typically from `${VAR:-}`) mean "no credentials".
fn normalize(config: &mut Config) {
    if config.druid.username.as_deref().is_some_and(str::is_empty) {
        config.druid.username = None;
    }
    if config.druid.password.as_deref().is_some_and(str::is_empty) {
        config.druid.password = None;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment Variable Substitution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// SAFETY: .expect() on LazyLock with a compile-time literal regex pattern,
// covered by test_env_var_pattern_compiles().
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("BUG: ENV_VAR_PATTERN regex is invalid")
});

/// Substitute environment variables in a string.
///
/// # Syntax
/// - `${VAR}` - Required, fail if not set
/// - `${VAR:-default}` - Optional with default
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        match (std::env::var(var_name), cap.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::MissingEnvVar {
            var,
            field: "configuration".to_string(),
        });
    }

    Ok(result.into_owned())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.schema != 1 {
        return Err(ConfigError::UnsupportedSchemaVersion {
            version: config.schema,
        });
    }

    match url::Url::parse(&config.druid.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(ConfigError::InvalidUrl {
                url: config.druid.url.clone(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Err(e) => {
            return Err(ConfigError::InvalidUrl {
                url: config.druid.url.clone(),
                message: e.to_string(),
            });
        }
    }

    let non_zero = [
        ("druid.timeout", config.druid.timeout.is_zero()),
        ("druid.connect_timeout", config.druid.connect_timeout.is_zero()),
        ("druid.max_response_size", config.druid.max_response_size == 0),
        ("server.max_body_size", config.server.max_body_size == 0),
        ("server.tools_page_size", config.server.tools_page_size == 0),
    ];
    if let Some((field, _)) = non_zero.iter().find(|(_, is_zero)| *is_zero) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be > 0".to_string(),
        });
    }

    if config.server.port == config.server.admin_port {
        return Err(ConfigError::InvalidValue {
            field: "server.admin_port".to_string(),
            reason: format!("must differ from server.port ({})", config.server.port),
        });
    }

    if config.druid.password.is_some() && config.druid.username.is_none() {
        return Err(ConfigError::InvalidValue {
            field: "druid.username".to_string(),
            reason: "required when druid.password is set".to_string(),
        });
    }

    Ok(())
}
