//! Prometheus metrics using the prometheus-client crate.
//!
//! Exported on the admin port at `/metrics` in OpenMetrics text format.
//! Label values are bounded: tool names come from the static catalog
//! (anything else is recorded as `unknown`) and methods/status codes are
//! small closed sets.

use std::time::Duration;

use druidgate_core::engine::EngineObserver;
use http::Method;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::tools::DruidTool;

// ─────────────────────────────────────────────────────────────────────────────
// Label Sets
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ToolCallLabels {
    /// Catalog tool name, or "unknown"
    pub tool: String,
    /// "success", "denied", "engine_error" or "error"
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MethodLabels {
    pub method: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StatusLabels {
    pub status_code: String,
}

/// Engine latency buckets in milliseconds.
static ENGINE_DURATION_BUCKETS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
];

/// Outcome label values for [`DruidGateMetrics::record_tool_call`].
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const DENIED: &str = "denied";
    pub const ENGINE_ERROR: &str = "engine_error";
    pub const ERROR: &str = "error";
}

/// All druidgate metrics, registered once at startup.
#[derive(Clone)]
pub struct DruidGateMetrics {
    pub tool_calls_total: Family<ToolCallLabels, Counter>,
    pub transport_denials_total: Family<MethodLabels, Counter>,
    pub engine_requests_total: Family<StatusLabels, Counter>,
    pub engine_request_duration_ms: Family<MethodLabels, Histogram>,
}

impl DruidGateMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let tool_calls_total = Family::<ToolCallLabels, Counter>::default();
        registry.register(
            "druidgate_tool_calls",
            "MCP tool calls by tool and outcome",
            tool_calls_total.clone(),
        );

        let transport_denials_total = Family::<MethodLabels, Counter>::default();
        registry.register(
            "druidgate_transport_denials",
            "Engine HTTP requests rejected by the read-only transport policy",
            transport_denials_total.clone(),
        );

        let engine_requests_total = Family::<StatusLabels, Counter>::default();
        registry.register(
            "druidgate_engine_requests",
            "Requests sent to the Druid router by response status",
            engine_requests_total.clone(),
        );

        let engine_request_duration_ms =
            Family::<MethodLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(ENGINE_DURATION_BUCKETS.iter().copied())
            });
        registry.register(
            "druidgate_engine_request_duration_ms",
            "Druid router round-trip latency in milliseconds",
            engine_request_duration_ms.clone(),
        );

        Self {
            tool_calls_total,
            transport_denials_total,
            engine_requests_total,
            engine_request_duration_ms,
        }
    }

    pub fn record_tool_call(&self, tool: &str, outcome: &str) {
        let tool = match DruidTool::from_name(tool) {
            Some(known) => known.name(),
            None => "unknown",
        };
        self.tool_calls_total
            .get_or_create(&ToolCallLabels {
                tool: tool.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub fn record_transport_denial(&self, method: &Method) {
        self.transport_denials_total
            .get_or_create(&MethodLabels {
                method: method_label(method).to_string(),
            })
            .inc();
    }
}

impl EngineObserver for DruidGateMetrics {
    fn on_response(&self, method: &Method, status: u16, elapsed: Duration) {
        self.engine_requests_total
            .get_or_create(&StatusLabels {
                status_code: status.to_string(),
            })
            .inc();
        self.engine_request_duration_ms
            .get_or_create(&MethodLabels {
                method: method_label(method).to_string(),
            })
            .observe(elapsed.as_secs_f64() * 1000.0);
    }
}

/// Extension methods collapse into one label value.
fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::CONNECT => "CONNECT",
        Method::TRACE => "TRACE",
        _ => "OTHER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(registry: &Registry) -> String {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, registry)
            .expect("encoding should succeed");
        buffer
    }

    #[test]
    fn test_metrics_registration() {
        let mut registry = Registry::default();
        let metrics = DruidGateMetrics::new(&mut registry);

        metrics.record_tool_call("listDatasources", outcome::SUCCESS);
        metrics.record_transport_denial(&Method::DELETE);
        metrics.on_response(&Method::GET, 200, Duration::from_millis(12));

        let buffer = encode(&registry);
        assert!(buffer.contains("druidgate_tool_calls_total"));
        assert!(buffer.contains("druidgate_transport_denials_total"));
        assert!(buffer.contains("druidgate_engine_requests_total"));
        assert!(buffer.contains("druidgate_engine_request_duration_ms_bucket"));
    }

    #[test]
    fn test_unknown_tool_names_are_collapsed() {
        let mut registry = Registry::default();
        let metrics = DruidGateMetrics::new(&mut registry);

        for i in 0..50 {
            metrics.record_tool_call(&format!("made_up_{i}"), outcome::ERROR);
        }

        let buffer = encode(&registry);
        assert!(buffer.contains(r#"tool="unknown""#));
        assert!(!buffer.contains("made_up_"));
    }

    #[test]
    fn test_extension_methods_use_other_label() {
        let mut registry = Registry::default();
        let metrics = DruidGateMetrics::new(&mut registry);

        let custom = Method::from_bytes(b"PURGE").unwrap();
        metrics.record_transport_denial(&custom);

        assert!(encode(&registry).contains(r#"method="OTHER""#));
    }
}
