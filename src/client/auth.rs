//! Auth Manager
//!
//! Holds API credentials and attaches them to outgoing requests. Bearer and
//! JWT tokens are refreshed when expired; concurrent callers during a
//! refresh all await one shared in-flight refresh.

use crate::error::AuthError;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Header used for API keys when none is configured
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

// =============================================================================
// Config & Tokens
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    Jwt,
    #[default]
    Bearer,
    #[serde(rename = "apikey", alias = "api-key")]
    ApiKey,
}

/// Credential configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    /// Initial access token
    pub token: Option<String>,
    pub api_key: Option<String>,
    /// Header carrying the API key; [`DEFAULT_API_KEY_HEADER`] when unset
    pub api_key_header: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute URL accepting `POST {refreshToken}`
    pub refresh_endpoint: Option<String>,
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Bearer,
            token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::ApiKey,
            api_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn api_key_header(&self) -> &str {
        self.api_key_header
            .as_deref()
            .unwrap_or(DEFAULT_API_KEY_HEADER)
    }
}

/// Current credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiry as epoch milliseconds; never expires when absent
    pub expires_at: Option<i64>,
}

impl AuthTokens {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.map_or(false, |at| now_ms >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}

/// Refresh endpoint response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

// =============================================================================
// Manager
// =============================================================================

type SharedRefresh = Shared<BoxFuture<'static, Result<AuthTokens, AuthError>>>;

#[derive(Default)]
struct AuthState {
    tokens: Option<AuthTokens>,
    /// In-flight refresh, if any
    refresh: Option<SharedRefresh>,
    /// Bumped whenever tokens are replaced or cleared
    generation: u64,
}

impl AuthState {
    fn replace(&mut self, tokens: Option<AuthTokens>) {
        self.tokens = tokens;
        self.refresh = None;
        self.generation += 1;
    }
}

/// Credential holder with single-flight token refresh
pub struct AuthManager {
    config: AuthConfig,
    http: reqwest::Client,
    state: Arc<Mutex<AuthState>>,
}

impl AuthManager {
    pub fn new(config: AuthConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Use `http` for refresh calls
    pub fn with_http_client(config: AuthConfig, http: reqwest::Client) -> Self {
        let mut state = AuthState::default();
        if let Some(token) = &config.token {
            state.tokens = Some(AuthTokens {
                access_token: token.clone(),
                refresh_token: config.refresh_token.clone(),
                expires_at: None,
            });
        }

        Self {
            config,
            http,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn set_tokens(&self, tokens: AuthTokens) {
        self.state.lock().replace(Some(tokens));
    }

    pub fn tokens(&self) -> Option<AuthTokens> {
        self.state.lock().tokens.clone()
    }

    /// Drop credentials and abandon any in-flight refresh
    pub fn clear_tokens(&self) {
        self.state.lock().replace(None);
    }

    pub fn is_token_expired(&self) -> bool {
        self.state
            .lock()
            .tokens
            .as_ref()
            .map_or(false, AuthTokens::is_expired)
    }

    /// Access token usable right now.
    ///
    /// `None` when unauthenticated. An expired token with a refresh token is
    /// refreshed first; an expired token without one is returned as is.
    pub async fn get_valid_token(&self) -> Result<Option<String>, AuthError> {
        let refresh = {
            let mut state = self.state.lock();
            let tokens = match &state.tokens {
                None => return Ok(None),
                Some(tokens) => tokens,
            };
            if !(tokens.is_expired() && tokens.refresh_token.is_some()) {
                return Ok(Some(tokens.access_token.clone()));
            }
            self.join_or_start_refresh(&mut state)
        };

        refresh.await.map(|tokens| Some(tokens.access_token))
    }

    /// Refresh now, joining a refresh already in flight
    pub async fn refresh_access_token(&self) -> Result<String, AuthError> {
        let refresh = {
            let mut state = self.state.lock();
            self.join_or_start_refresh(&mut state)
        };
        refresh.await.map(|tokens| tokens.access_token)
    }

    fn join_or_start_refresh(&self, state: &mut AuthState) -> SharedRefresh {
        if let Some(refresh) = &state.refresh {
            debug!("Joining in-flight token refresh");
            return refresh.clone();
        }

        let generation = state.generation;
        let previous_refresh = state.tokens.as_ref().and_then(|t| t.refresh_token.clone());
        let http = self.http.clone();
        let endpoint = self.config.refresh_endpoint.clone();
        let shared_state = Arc::clone(&self.state);

        let refresh = async move {
            let result = perform_refresh(&http, endpoint.as_deref(), previous_refresh).await;

            let mut state = shared_state.lock();
            if state.generation == generation {
                match &result {
                    Ok(tokens) => {
                        info!("Access token refreshed");
                        state.replace(Some(tokens.clone()));
                    }
                    Err(err) => {
                        warn!(error = %err, "Token refresh failed, clearing credentials");
                        state.replace(None);
                    }
                }
            }
            result
        }
        .boxed()
        .shared();

        state.refresh = Some(refresh.clone());
        refresh
    }

    /// Headers carrying the configured credentials
    pub async fn auth_headers(&self) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();

        match self.config.kind {
            AuthKind::Jwt | AuthKind::Bearer => {
                if let Some(token) = self.get_valid_token().await? {
                    let value = HeaderValue::from_str(&format!("Bearer {}", token))
                        .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;
                    headers.insert(AUTHORIZATION, value);
                }
            }
            AuthKind::ApiKey => {
                if let Some(key) = &self.config.api_key {
                    let name = HeaderName::from_bytes(self.config.api_key_header().as_bytes())
                        .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;
                    let value = HeaderValue::from_str(key)
                        .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;
                    headers.insert(name, value);
                }
            }
        }

        Ok(headers)
    }

    /// Attach credentials to `request`.
    ///
    /// Credential failures are logged and the request goes out without them.
    pub async fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth_headers().await {
            Ok(headers) => request.headers(headers),
            Err(err) => {
                warn!(error = %err, "Sending request without credentials");
                request
            }
        }
    }
}

async fn perform_refresh(
    http: &reqwest::Client,
    endpoint: Option<&str>,
    refresh_token: Option<String>,
) -> Result<AuthTokens, AuthError> {
    let (endpoint, refresh_token) = match (endpoint, refresh_token) {
        (Some(endpoint), Some(token)) => (endpoint, token),
        _ => return Err(AuthError::MissingRefreshCredentials),
    };

    debug!(endpoint, "Refreshing access token");
    let response = http
        .post(endpoint)
        .json(&serde_json::json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .map_err(|e| AuthError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::RefreshRejected {
            status: status.as_u16(),
        });
    }

    let body: RefreshResponse = response
        .json()
        .await
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

    Ok(AuthTokens {
        access_token: body.access_token,
        refresh_token: body.refresh_token.or(Some(refresh_token)),
        expires_at: body
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now().timestamp_millis() + secs * 1000),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::serve;
    use assert_matches::assert_matches;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn expired_tokens(refresh: &str) -> AuthTokens {
        AuthTokens {
            access_token: "stale".into(),
            refresh_token: Some(refresh.into()),
            expires_at: Some(Utc::now().timestamp_millis() - 1_000),
        }
    }

    async fn refresh_server(calls: Arc<AtomicUsize>, status: StatusCode) -> String {
        let router = Router::new().route(
            "/auth/refresh",
            post(move |Json(body): Json<serde_json::Value>| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    assert_eq!(body["refreshToken"], "refresh-1");
                    (
                        status,
                        Json(serde_json::json!({ "accessToken": "fresh", "expiresIn": 3600 })),
                    )
                }
            }),
        );
        format!("{}/auth/refresh", serve(router).await)
    }

    fn manager(endpoint: Option<String>) -> AuthManager {
        AuthManager::new(AuthConfig {
            kind: AuthKind::Jwt,
            refresh_endpoint: endpoint,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_unauthenticated_has_no_token() {
        let auth = manager(None);
        assert_eq!(auth.get_valid_token().await.unwrap(), None);
        assert!(auth.auth_headers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_configured_token_seeds_state() {
        let auth = AuthManager::new(AuthConfig::bearer("abc"));
        assert_eq!(auth.get_valid_token().await.unwrap().as_deref(), Some("abc"));

        let headers = auth.auth_headers().await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_is_returned() {
        let auth = manager(None);
        auth.set_tokens(AuthTokens {
            expires_at: Some(0),
            ..AuthTokens::new("old")
        });
        assert!(auth.is_token_expired());
        assert_eq!(auth.get_valid_token().await.unwrap().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = refresh_server(calls.clone(), StatusCode::OK).await;
        let auth = Arc::new(manager(Some(endpoint)));
        auth.set_tokens(expired_tokens("refresh-1"));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let auth = auth.clone();
                tokio::spawn(async move { auth.get_valid_token().await })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert_eq!(task.unwrap().unwrap().as_deref(), Some("fresh"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let tokens = auth.tokens().unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));
        assert!(!tokens.is_expired());

        // Fresh token: no further refresh
        auth.get_valid_token().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_tokens() {
        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = refresh_server(calls.clone(), StatusCode::UNAUTHORIZED).await;
        let auth = manager(Some(endpoint));
        auth.set_tokens(expired_tokens("refresh-1"));

        let err = auth.get_valid_token().await.unwrap_err();
        assert_matches!(err, AuthError::RefreshRejected { status: 401 });
        assert!(auth.tokens().is_none());
        assert_eq!(auth.get_valid_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_endpoint_clears_tokens() {
        let auth = manager(None);
        auth.set_tokens(expired_tokens("refresh-1"));

        let err = auth.refresh_access_token().await.unwrap_err();
        assert_eq!(err, AuthError::MissingRefreshCredentials);
        assert!(auth.tokens().is_none());
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let auth = AuthManager::new(AuthConfig::api_key("k-123"));
        let headers = auth.auth_headers().await.unwrap();
        assert_eq!(headers["x-api-key"], "k-123");

        let custom = AuthManager::new(AuthConfig {
            api_key_header: Some("X-Store-Key".into()),
            ..AuthConfig::api_key("k-456")
        });
        let headers = custom.auth_headers().await.unwrap();
        assert_eq!(headers["x-store-key"], "k-456");
    }

    #[tokio::test]
    async fn test_apply_auth_proceeds_without_credentials_on_failure() {
        let auth = manager(None);
        auth.set_tokens(expired_tokens("refresh-1"));

        let request = auth
            .apply_auth(reqwest::Client::new().get("http://localhost/"))
            .await
            .build()
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_config_wire_format() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "type": "apikey",
            "apiKey": "secret",
            "apiKeyHeader": "X-Key"
        }))
        .unwrap();
        assert_eq!(config.kind, AuthKind::ApiKey);
        assert_eq!(config.api_key_header(), "X-Key");
        assert_eq!(AuthConfig::default().api_key_header(), DEFAULT_API_KEY_HEADER);
    }
}
