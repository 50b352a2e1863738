//! Catalog configuration
//!
//! Layered, later wins: built-in defaults, an optional YAML file, then
//! environment variables. The binary applies its command-line flags last.

use crate::cache::CacheConfig;
use crate::client::{ApiClientConfig, AuthConfig, AuthKind, RetryConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::monitoring::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Primary API URL variable
pub const ENV_API_URL: &str = "CATALOG_API_URL";
/// Fallback API URL variable shared with the web front end
pub const ENV_PUBLIC_API_URL: &str = "NEXT_PUBLIC_API_URL";
pub const ENV_API_TOKEN: &str = "CATALOG_API_TOKEN";
pub const ENV_API_KEY: &str = "CATALOG_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the catalog API
    pub api_url: String,
    /// Route prefix of the product endpoints
    pub products_route: String,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
    /// Run adapter reads under the retry policy
    pub retry_reads: bool,
    pub auth: Option<AuthConfig>,
    pub cache: CacheConfig,
    pub request_log: LoggerConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            products_route: crate::adapters::http_products::DEFAULT_PRODUCTS_ROUTE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryConfig::default(),
            retry_reads: true,
            auth: None,
            cache: CacheConfig::default(),
            request_log: LoggerConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_yaml_str(&contents)
    }

    /// Defaults or `path`, overlaid with the process environment, validated
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay variables read through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_URL).or_else(|| non_empty(ENV_PUBLIC_API_URL)) {
            self.api_url = url;
        }

        if let Some(token) = non_empty(ENV_API_TOKEN) {
            let auth = self.auth.get_or_insert_with(AuthConfig::default);
            if auth.kind == AuthKind::ApiKey {
                auth.kind = AuthKind::Bearer;
            }
            auth.token = Some(token);
        }

        if let Some(key) = non_empty(ENV_API_KEY) {
            let auth = self.auth.get_or_insert_with(AuthConfig::default);
            auth.kind = AuthKind::ApiKey;
            auth.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_url).map_err(|e| {
            Error::Configuration(format!("invalid api_url '{}': {}", self.api_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "api_url must use http or https: {}",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration("timeout_secs must be positive".into()));
        }
        if !self.products_route.starts_with('/') {
            return Err(Error::Configuration(format!(
                "products_route must start with '/': {}",
                self.products_route
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Client settings derived from this configuration
    pub fn client_config(&self) -> ApiClientConfig {
        let mut config = ApiClientConfig::new(self.api_url.clone())
            .with_timeout(self.timeout())
            .with_logger(self.request_log.clone())
            .with_retry(RetryPolicy::from(&self.retry));
        if let Some(auth) = &self.auth {
            config = config.with_auth(auth.clone());
        }
        config
    }
}
