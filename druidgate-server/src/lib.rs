//! druidgate HTTP server.
//!
//! Serves the Druid tool catalog over MCP (`POST /mcp`), relays raw Druid API
//! calls, and exposes health and metrics on a separate admin port. Read-only
//! enforcement comes from `druidgate-core::policy`.

pub mod admin;
pub mod error;
pub mod logging_layer;
pub mod mcp_handler;
pub mod metrics;
pub mod passthrough;
pub mod router;
pub mod tools;
