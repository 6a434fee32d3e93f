//! druidgate core: read-only policy enforcement for an MCP server fronting the
//! Apache Druid management API.
//!
//! The policy layer is transport-agnostic. One [`policy::PolicyState`] is shared
//! by four guards:
//!
//! - [`policy::OperationClassifier`] decides read-only vs. mutating by tool name
//! - [`policy::InvocationGuard`] blocks mutating tool calls before they run
//! - [`policy::DiscoveryFilter`] hides mutating tools from listings
//! - [`policy::TransportGuard`] rejects non-read HTTP calls to the engine
//!
//! The HTTP server lives in `druidgate-server`; this crate also carries the
//! JSON-RPC framing, the Druid client and configuration it uses.

pub mod config;
pub mod engine;
pub mod error;
pub mod jsonrpc;
pub mod policy;
pub mod protocol;

pub use error::{DruidGateError, Result};
