//! Druid router client with connection pooling.
//!
//! Every request is checked by the [`TransportGuard`] before it is sent, so in
//! read-only mode nothing but `GET` and SQL query submissions reaches Druid,
//! whichever code path issued the call.
//!
//! # Error Classification
//!
//! - Timeout errors → `EngineTimeout` (-32001)
//! - Connection errors → `EngineConnectionFailed` (-32000)
//! - Non-success statuses and other failures → `EngineError` (-32002)
//!
//! No automatic retry: a retried `POST` could run an ingestion twice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::Method;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, warn};

use crate::error::DruidGateError;
use crate::policy::TransportGuard;

/// Connection settings for the Druid router.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the Druid router (e.g., "http://localhost:8888")
    pub router_url: String,
    /// Basic-auth user, when the cluster runs the basic-security extension
    pub username: Option<String>,
    pub password: Option<String>,
    /// Request timeout (includes connection + response)
    pub timeout: Duration,
    /// Connection timeout (TCP + TLS handshake)
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    /// Maximum response body size in bytes.
    pub max_response_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            router_url: "http://localhost:8888".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 16,
            pool_idle_timeout: Duration::from_secs(90),
            max_response_size: 10 * 1024 * 1024, // 10 MB
        }
    }
}

impl EngineConfig {
    pub fn with_router_url(router_url: impl Into<String>) -> Self {
        Self {
            router_url: router_url.into(),
            ..Default::default()
        }
    }
}

/// Raw engine answer, relayed as-is by the pass-through surface.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl EngineResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Receives one callback per completed engine round trip.
pub trait EngineObserver: Send + Sync {
    fn on_response(&self, method: &Method, status: u16, elapsed: Duration);
}

/// Druid HTTP API as used by the tools (enables stubbing in tests).
#[async_trait::async_trait]
pub trait DruidApi: Send + Sync {
    /// Send a request and return the engine's answer whatever its status.
    async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> Result<EngineResponse, DruidGateError>;

    /// `GET` and return the body; non-success statuses become errors.
    async fn get(&self, path: &str) -> Result<String, DruidGateError> {
        expect_success(self.send(Method::GET, path, None).await?)
    }

    /// `POST` a JSON document and return the body.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<String, DruidGateError> {
        let bytes = Bytes::from(body.to_string());
        expect_success(self.send(Method::POST, path, Some(bytes)).await?)
    }

    /// `POST` without a body (Druid's action endpoints such as suspend).
    async fn post_empty(&self, path: &str) -> Result<String, DruidGateError> {
        expect_success(self.send(Method::POST, path, None).await?)
    }

    async fn delete(&self, path: &str) -> Result<String, DruidGateError> {
        expect_success(self.send(Method::DELETE, path, None).await?)
    }
}

fn expect_success(response: EngineResponse) -> Result<String, DruidGateError> {
    if response.is_success() {
        Ok(response.text())
    } else {
        Err(classify_engine_http_error(response.status))
    }
}

/// Druid router client.
///
/// `Clone` and shareable across tasks; reqwest pools connections internally.
#[derive(Clone)]
pub struct DruidClient {
    client: Client,
    config: EngineConfig,
    base_url: String,
    guard: TransportGuard,
    observer: Option<Arc<dyn EngineObserver>>,
}

impl DruidClient {
    /// Build a client. Fails if the router URL is not an absolute URL.
    pub fn new(config: EngineConfig, guard: TransportGuard) -> Result<Self, DruidGateError> {
        if let Err(e) = url::Url::parse(&config.router_url) {
            return Err(DruidGateError::InvalidParams {
                details: format!("invalid Druid router URL '{}': {}", config.router_url, e),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| DruidGateError::InvalidParams {
                details: format!("cannot build HTTP client: {}", e),
            })?;

        let base_url = config.router_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            config,
            base_url,
            guard,
            observer: None,
        })
    }

    /// Report every round trip to `observer` (used for metrics).
    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Checks `/status/health` on the router.
    #[tracing::instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), DruidGateError> {
        let body = self.get("/status/health").await?;
        if body.trim() == "true" {
            debug!(url = %self.base_url, "Druid health check passed");
            Ok(())
        } else {
            Err(DruidGateError::ServiceUnavailable {
                reason: format!("Druid reports unhealthy: {}", body.trim()),
            })
        }
    }

    /// Read the response body, refusing anything above `max_response_size`.
    async fn read_body_limited(
        &self,
        response: reqwest::Response,
    ) -> Result<Bytes, DruidGateError> {
        let max_size = self.config.max_response_size;
        let too_large = |size: usize| DruidGateError::EngineError {
            status: 502,
            message: format!("response too large: {size} bytes exceeds {max_size} byte limit"),
        };

        if let Some(content_length) = response.content_length() {
            if content_length as usize > max_size {
                warn!(
                    content_length,
                    max_response_size = max_size,
                    "Druid response exceeds size limit (Content-Length)"
                );
                return Err(too_large(content_length as usize));
            }
        }

        let mut buf = Vec::with_capacity(
            response
                .content_length()
                .map(|cl| cl as usize)
                .unwrap_or(8192)
                .min(max_size),
        );

        let mut response = response;
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            error!(error = %e, "Failed to read Druid response body chunk");
            DruidGateError::EngineError {
                status: 502,
                message: format!("failed to read response: {}", e),
            }
        })? {
            if buf.len() + chunk.len() > max_size {
                warn!(
                    accumulated = buf.len(),
                    max_response_size = max_size,
                    "Druid response exceeds size limit during streaming"
                );
                return Err(too_large(buf.len() + chunk.len()));
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf.into())
    }

    fn classify_error(&self, error: reqwest::Error) -> DruidGateError {
        if error.is_timeout() {
            warn!(
                timeout_secs = self.config.timeout.as_secs(),
                "Druid request timed out"
            );
            DruidGateError::EngineTimeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if error.is_connect() {
            warn!(url = %self.base_url, "Failed to connect to Druid");
            DruidGateError::EngineConnectionFailed {
                url: self.base_url.clone(),
                reason: error.to_string(),
            }
        } else {
            error!(error = %error, "Druid request failed");
            DruidGateError::EngineError {
                status: 502,
                message: error.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl DruidApi for DruidClient {
    #[tracing::instrument(skip(self, body))]
    async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> Result<EngineResponse, DruidGateError> {
        let path = path_and_query
            .split_once('?')
            .map_or(path_and_query, |(path, _)| path);
        self.guard.check(&method, path)?;

        let url = format!("{}{}", self.base_url, path_and_query);
        debug!(url = %url, "Sending request to Druid");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| self.classify_error(e))?;
        let status = response.status().as_u16();
        if let Some(observer) = &self.observer {
            observer.on_response(&method, status, started.elapsed());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !response.status().is_success() {
            warn!(status, "Druid returned error status");
        }

        let body = self.read_body_limited(response).await?;
        Ok(EngineResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Map a non-success Druid status to an error.
///
/// - 401/403 → authentication problem between druidgate and Druid
/// - 404 → unknown datasource, task, supervisor or lookup
/// - Other 4xx → request rejected by Druid
/// - 503 → `ServiceUnavailable`
/// - Other 5xx → Druid server error
pub fn classify_engine_http_error(status: u16) -> DruidGateError {
    let message = match status {
        401 | 403 => "authentication with Druid failed",
        404 => "resource not found",
        429 => "Druid is rate limiting requests",
        400..=499 => "request rejected by Druid",
        503 => {
            return DruidGateError::ServiceUnavailable {
                reason: format!("Druid unavailable: HTTP {status}"),
            };
        }
        _ => "Druid server error",
    };
    DruidGateError::EngineError {
        status,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{basic_auth, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str, read_only: bool) -> DruidClient {
        DruidClient::new(
            EngineConfig::with_router_url(uri),
            TransportGuard::new(PolicyState::new(read_only)),
        )
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.max_response_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_router_url() {
        let result = DruidClient::new(
            EngineConfig::with_router_url("not a url"),
            TransportGuard::new(PolicyState::disabled()),
        );
        assert!(matches!(result, Err(DruidGateError::InvalidParams { .. })));
    }

    #[tokio::test]
    async fn test_get_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/druid/coordinator/v1/datasources"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"["wikipedia"]"#))
            .mount(&server)
            .await;

        let body = client(&server.uri(), true)
            .get("/druid/coordinator/v1/datasources")
            .await
            .unwrap();
        assert_eq!(body, r#"["wikipedia"]"#);
    }

    #[tokio::test]
    async fn test_sql_post_allowed_in_read_only_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/druid/v2/sql"))
            .and(body_json(serde_json::json!({"query": "SELECT 1"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("[{\"EXPR$0\":1}]"))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server.uri(), true)
            .post_json("/druid/v2/sql", &serde_json::json!({"query": "SELECT 1"}))
            .await
            .unwrap();
        assert!(body.contains("EXPR$0"));
    }

    #[tokio::test]
    async fn test_mutating_request_never_leaves_the_process() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server.uri(), true)
            .delete("/druid/coordinator/v1/datasources/wikipedia")
            .await
            .unwrap_err();
        assert!(matches!(err, DruidGateError::TransportDenied { status: 405, .. }));
    }

    #[tokio::test]
    async fn test_query_string_is_ignored_by_guard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/druid/v2/sql"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let result = client(&server.uri(), true)
            .send(
                Method::POST,
                "/druid/v2/sql?pretty",
                Some(Bytes::from("{}")),
            )
            .await
            .unwrap();
        assert_eq!(result.status, 200);
    }

    #[tokio::test]
    async fn test_basic_auth_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(basic_auth("admin", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        let config = EngineConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..EngineConfig::with_router_url(server.uri())
        };
        let client =
            DruidClient::new(config, TransportGuard::new(PolicyState::disabled())).unwrap();
        client.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such datasource"))
            .mount(&server)
            .await;

        let client = client(&server.uri(), false);
        let err = client
            .get("/druid/coordinator/v1/datasources/x")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DruidGateError::EngineError {
                status: 404,
                message: "resource not found".to_string()
            }
        );

        let raw = client
            .send(Method::GET, "/druid/coordinator/v1/datasources/x", None)
            .await
            .unwrap();
        assert_eq!(raw.status, 404);
        assert_eq!(raw.text(), "no such datasource");
    }

    #[tokio::test]
    async fn test_response_size_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 2048]))
            .mount(&server)
            .await;

        let config = EngineConfig {
            max_response_size: 1024,
            ..EngineConfig::with_router_url(server.uri())
        };
        let client =
            DruidClient::new(config, TransportGuard::new(PolicyState::disabled())).unwrap();

        match client.get("/status").await {
            Err(DruidGateError::EngineError { message, .. }) => {
                assert!(
                    message.contains("too large"),
                    "Expected 'too large' in: {message}"
                );
            }
            other => panic!("Expected EngineError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Port 9 (discard) is closed on test hosts
        let client = client("http://127.0.0.1:9", false);
        let err = client.get("/status").await.unwrap_err();
        assert!(matches!(
            err,
            DruidGateError::EngineConnectionFailed { .. } | DruidGateError::EngineTimeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_observer_sees_each_round_trip() {
        struct Counter(AtomicUsize);
        impl EngineObserver for Counter {
            fn on_response(&self, _method: &Method, _status: u16, _elapsed: Duration) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let client = client(&server.uri(), false).with_observer(counter.clone());
        client.get("/status").await.unwrap();
        client.get("/status").await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_classify_engine_http_error() {
        assert!(matches!(
            classify_engine_http_error(503),
            DruidGateError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            classify_engine_http_error(401),
            DruidGateError::EngineError { status: 401, .. }
        ));
        assert!(matches!(
            classify_engine_http_error(500),
            DruidGateError::EngineError { status: 500, .. }
        ));
    }
}
