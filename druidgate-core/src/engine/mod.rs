//! Apache Druid HTTP API access.

pub mod client;
pub mod paths;

pub use client::{
    DruidApi, DruidClient, EngineConfig, EngineObserver, EngineResponse,
    classify_engine_http_error,
};
