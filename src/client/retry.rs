//! Retry Policy
//!
//! Exponential backoff with random jitter for transient API failures.
//! Retries are opt-in: callers wrap an operation with [`RetryPolicy::execute`]
//! (or `ApiClient::request_with_retry`); plain client calls never retry.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1000);

/// Details of a scheduled retry, passed to retry observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based number of the retry about to run
    pub attempt: u32,
    pub max_retries: u32,
    pub delay: Duration,
}

/// Retry configuration as it appears in config files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
            max_jitter_ms: DEFAULT_MAX_JITTER.as_millis() as u64,
        }
    }
}

/// Exponential backoff retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound on any single delay, jitter included
    pub max_delay: Duration,
    /// Jitter is drawn uniformly from `[0, max_jitter)`
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO).with_jitter(Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Whether a failure on 0-based `attempt` should be retried.
    ///
    /// Only network failures and 5xx responses qualify, and only while
    /// retries remain. Client errors and non-HTTP failures are final.
    pub fn should_retry(&self, err: &Error, attempt: u32) -> bool {
        attempt < self.max_retries && err.is_retryable()
    }

    /// `base_delay * 2^attempt`, capped at `max_delay`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Backoff plus random jitter, capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.backoff_for(attempt)
            .saturating_add(jitter)
            .min(self.max_delay)
    }

    /// Run `operation`, retrying transient failures.
    ///
    /// After the last permitted retry the final error is returned.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_notify(operation, |_, _| {}).await
    }

    /// Like [`execute`](Self::execute), calling `notify` before each retry sleep
    pub async fn execute_notify<T, F, Fut, N>(&self, mut operation: F, mut notify: N) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        N: FnMut(&Error, RetryAttempt),
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err, attempt) => {
                    let delay = self.delay_for(attempt);
                    let retry = RetryAttempt {
                        attempt: attempt + 1,
                        max_retries: self.max_retries,
                        delay,
                    };
                    warn!(
                        attempt = retry.attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    notify(&err, retry);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
