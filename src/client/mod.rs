//! Catalog API client
//!
//! Thin JSON-over-HTTP executor on top of `reqwest`. Every call gets
//! credentials from the [`AuthManager`] when one is configured, is logged
//! through the [`RequestLogger`] and leaves one metric in the
//! [`PerformanceMonitor`]. Failures of any kind surface as [`ApiError`].

pub mod auth;
pub mod retry;

pub use auth::{AuthConfig, AuthKind, AuthManager, AuthTokens};
pub use retry::{RetryAttempt, RetryConfig, RetryPolicy};

use crate::error::{ApiError, Error, Result};
use crate::monitoring::{LoggerConfig, PerformanceMetric, PerformanceMonitor, RequestLogger};
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Scheme, host and optional path prefix of the API
    pub base_url: String,
    pub timeout: Duration,
    pub auth: Option<AuthConfig>,
    pub logger: LoggerConfig,
    /// Policy used by [`ApiClient::request_with_retry`]
    pub retry: RetryPolicy,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            auth: None,
            logger: LoggerConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_logger(mut self, logger: LoggerConfig) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

// =============================================================================
// Client
// =============================================================================

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: RwLock<Option<Arc<AuthManager>>>,
    logger: Arc<RequestLogger>,
    monitor: Arc<PerformanceMonitor>,
    retry: RetryPolicy,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth.read().is_some())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let base = reqwest::Url::parse(&config.base_url).map_err(|e| {
            Error::Configuration(format!("invalid API base URL '{}': {}", config.base_url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "API base URL must be http or https: {}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let auth = config
            .auth
            .map(|auth| Arc::new(AuthManager::with_http_client(auth, http.clone())));

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: RwLock::new(auth),
            logger: Arc::new(RequestLogger::new(config.logger)),
            monitor: Arc::new(PerformanceMonitor::new()),
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn logger(&self) -> Arc<RequestLogger> {
        self.logger.clone()
    }

    pub fn performance_monitor(&self) -> Arc<PerformanceMonitor> {
        self.monitor.clone()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn auth_manager(&self) -> Option<Arc<AuthManager>> {
        self.auth.read().clone()
    }

    /// Replace the credential configuration
    pub fn set_auth(&self, config: AuthConfig) {
        let manager = AuthManager::with_http_client(config, self.http.clone());
        *self.auth.write() = Some(Arc::new(manager));
    }

    /// Drop credentials; subsequent requests go out unauthenticated
    pub fn clear_auth(&self) {
        if let Some(manager) = self.auth.write().take() {
            manager.clear_tokens();
        }
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = encode_body(body)?;
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = encode_body(body)?;
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = encode_body(body)?;
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None).await
    }

    /// Run `operation` under the client's retry policy, logging each retry
    pub async fn request_with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let logger = &self.logger;
        self.retry
            .execute_notify(operation, |err, retry| {
                logger.warn(
                    &format!("Request failed, retrying in {}ms", retry.delay.as_millis()),
                    json!({
                        "attempt": retry.attempt,
                        "maxRetries": retry.max_retries,
                        "error": err.to_string(),
                    }),
                    None,
                );
            })
            .await
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.url(path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = &body {
            request = request.json(body);
        }
        if let Some(auth) = self.auth_manager() {
            request = auth.apply_auth(request).await;
        }

        self.logger.log_request(method.as_str(), path, body.as_ref());
        let started = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let err = ApiError::from_reqwest(err);
                return Err(self.fail(&method, path, started, None, err));
            }
        };

        let status = response.status();
        let payload = match response.bytes().await {
            Ok(payload) => payload,
            Err(err) => {
                let err = ApiError::from_reqwest(err);
                return Err(self.fail(&method, path, started, Some(status.as_u16()), err));
            }
        };

        let duration_ms = elapsed_ms(started);
        self.logger
            .log_response(method.as_str(), path, status.as_u16(), duration_ms);

        if !status.is_success() {
            let err = ApiError::from_response(
                status.as_u16(),
                &payload,
                status.canonical_reason().unwrap_or("Request failed"),
            );
            return Err(self.fail(&method, path, started, Some(status.as_u16()), err));
        }

        // Empty bodies decode as `null` so `()` and `Option<T>` work
        let bytes: &[u8] = if payload.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &payload
        };

        match serde_json::from_slice(bytes) {
            Ok(value) => {
                self.record(&method, path, duration_ms, Some(status.as_u16()), Some(payload.len()), true);
                Ok(value)
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Response body did not match expected type");
                let err = ApiError::decode(status.as_u16(), format!("Invalid response body: {}", e));
                Err(self.fail(&method, path, started, Some(status.as_u16()), err))
            }
        }
    }

    /// Log and record a failed call, returning the error to surface
    fn fail(
        &self,
        method: &Method,
        path: &str,
        started: Instant,
        status: Option<u16>,
        err: ApiError,
    ) -> Error {
        let duration_ms = elapsed_ms(started);
        self.logger.log_error(method.as_str(), path, &err, duration_ms);
        self.record(method, path, duration_ms, status, None, false);
        err.into()
    }

    fn record(
        &self,
        method: &Method,
        path: &str,
        duration_ms: u64,
        status: Option<u16>,
        response_size: Option<usize>,
        success: bool,
    ) {
        self.monitor.record_metric(PerformanceMetric {
            duration_ms,
            response_size: response_size.map(|s| s as u64),
            timestamp: Utc::now(),
            method: method.as_str().to_string(),
            url: path.to_string(),
            status,
            success,
        });
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::setup(e).into())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}


#[cfg(test)]
mod tests {
    use super::test_support::{closed_port_url, serve};
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{delete, get};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn client_for(router: Router) -> ApiClient {
        let base = serve(router).await;
        ApiClient::new(ApiClientConfig::new(base)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert_matches!(
            ApiClient::new(ApiClientConfig::new("not a url")),
            Err(Error::Configuration(_))
        );
        assert_matches!(
            ApiClient::new(ApiClientConfig::new("ftp://example.com")),
            Err(Error::Configuration(_))
        );
    }

    #[tokio::test]
    async fn test_debug_omits_credentials() {
        let client = ApiClient::new(
            ApiClientConfig::new("http://localhost:3001").with_auth(AuthConfig::bearer("secret")),
        )
        .unwrap();

        let rendered = format!("{:?}", client);
        assert!(rendered.contains("http://localhost:3001"));
        assert!(rendered.contains("authenticated: true"));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn test_get_decodes_and_records_metric() {
        let client = client_for(Router::new().route(
            "/api/ping",
            get(|| async { Json(json!({ "ok": true })) }),
        ))
        .await;

        let body: Value = client.get("/api/ping").await.unwrap();
        assert_eq!(body["ok"], true);

        let metrics = client.performance_monitor().export();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].status, Some(200));
        assert_eq!(metrics[0].method, "GET");
        assert!(metrics[0].success);
    }

    #[tokio::test]
    async fn test_error_body_populates_api_error() {
        let client = client_for(Router::new().route(
            "/api/thing",
            get(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": "Bad rank", "code": "INVALID_RANK" })),
                )
            }),
        ))
        .await;

        let err = client.get::<Value>("/api/thing").await.unwrap_err();
        assert_matches!(err, Error::Api(ref e) if e.status == 422 && e.code == "INVALID_RANK");

        let stats = client.performance_monitor().stats();
        assert_eq!(stats.errors, 1);
    }

    #[tokio::test]
    async fn test_plain_error_body_uses_status_code() {
        let client = client_for(Router::new().route(
            "/api/thing",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
        ))
        .await;

        let err = client.get::<Value>("/api/thing").await.unwrap_err();
        assert_matches!(err, Error::Api(ref e) if e.code == "HTTP_500" && e.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_unit() {
        let client = client_for(Router::new().route(
            "/api/thing/1",
            delete(|| async { StatusCode::NO_CONTENT }),
        ))
        .await;

        let () = client.delete("/api/thing/1").await.unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let client = client_for(Router::new().route("/api/thing", get(|| async { "not json" }))).await;

        let err = client.get::<Vec<u32>>("/api/thing").await.unwrap_err();
        assert_matches!(err, Error::Api(ref e) if e.code == ApiError::DECODE_ERROR && e.status == 200);

        let metrics = client.performance_monitor().export();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].status, Some(200));
        assert!(!metrics[0].success);
        assert_eq!(client.performance_monitor().stats().errors, 1);
    }

    #[tokio::test]
    async fn test_network_failure_has_zero_status() {
        let client = ApiClient::new(ApiClientConfig::new(closed_port_url().await)).unwrap();

        let err = client.get::<Value>("/api/products").await.unwrap_err();
        assert_matches!(err, Error::Api(ref e) if e.status == 0 && e.code == ApiError::NETWORK_ERROR);

        let metrics = client.performance_monitor().export();
        assert_eq!(metrics[0].status, None);
        assert!(!metrics[0].success);
    }

    #[tokio::test]
    async fn test_credentials_are_attached_and_cleared() {
        let client = client_for(Router::new().route(
            "/api/whoami",
            get(|headers: AxumHeaders| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(json!({ "auth": auth }))
            }),
        ))
        .await;

        client.set_auth(AuthConfig::bearer("t0k3n"));
        let body: Value = client.get("/api/whoami").await.unwrap();
        assert_eq!(body["auth"], "Bearer t0k3n");

        client.clear_auth();
        assert!(client.auth_manager().is_none());
        let body: Value = client.get("/api/whoami").await.unwrap();
        assert_eq!(body["auth"], "");
    }

    #[tokio::test]
    async fn test_request_with_retry_retries_server_errors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let base = serve(Router::new().route(
            "/api/flaky",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        ))
        .await;

        let client = ApiClient::new(
            ApiClientConfig::new(base)
                .with_logger(LoggerConfig {
                    enable_storage: true,
                    ..Default::default()
                })
                .with_retry(
                    RetryPolicy::new(3, Duration::from_millis(1)).with_jitter(Duration::ZERO),
                ),
        )
        .unwrap();

        let err = client
            .request_with_retry(|| client.get::<Value>("/api/flaky"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(hits.load(Ordering::SeqCst), 4);

        let retries = client
            .logger()
            .logs(None)
            .into_iter()
            .filter(|e| e.message.starts_with("Request failed, retrying"))
            .count();
        assert_eq!(retries, 3);
    }
}
