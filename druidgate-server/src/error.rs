//! Process-level errors for the druidgate binary.

use druidgate_core::config::ConfigError;
use druidgate_core::error::DruidGateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The Druid client could not be built or the startup health check failed.
    #[error("engine error: {0}")]
    Engine(#[from] DruidGateError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to render output: {0}")]
    Output(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Exit code for `main`: 2 for bad configuration, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            ServerError::Config(_) => 2,
            _ => 1,
        }
    }
}
