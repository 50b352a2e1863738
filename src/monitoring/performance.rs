//! Performance Monitor
//!
//! Bounded in-memory record of completed API requests with aggregate
//! statistics. The buffer keeps the most recent metrics; once full, the
//! oldest metric is evicted for every new one.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of metrics retained
pub const DEFAULT_MAX_METRICS: usize = 1000;

/// Requests slower than this count as slow
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 2000;

// =============================================================================
// Metric
// =============================================================================

/// One completed request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub duration_ms: u64,
    /// Body size in bytes, when a response was received
    pub response_size: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    /// HTTP status; absent for network failures
    pub status: Option<u16>,
    pub success: bool,
}

// =============================================================================
// Stats
// =============================================================================

/// Aggregate view over a set of metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    /// Mean duration, rounded to the nearest millisecond
    pub average_response_time_ms: u64,
    /// Successful share in percent, rounded to 2 decimals
    pub success_rate: f64,
    pub total_requests: usize,
    pub errors: usize,
    pub slow_requests: usize,
}

impl PerformanceStats {
    fn from_metrics<'a, I>(metrics: I, slow_threshold_ms: u64) -> Self
    where
        I: IntoIterator<Item = &'a PerformanceMetric>,
    {
        let mut total = 0usize;
        let mut successes = 0usize;
        let mut slow = 0usize;
        let mut duration_sum = 0u128;

        for metric in metrics {
            total += 1;
            if metric.success {
                successes += 1;
            }
            if metric.duration_ms > slow_threshold_ms {
                slow += 1;
            }
            duration_sum += u128::from(metric.duration_ms);
        }

        if total == 0 {
            return Self::default();
        }

        let average = (duration_sum as f64 / total as f64).round() as u64;
        let rate = successes as f64 / total as f64 * 100.0;

        Self {
            average_response_time_ms: average,
            success_rate: (rate * 100.0).round() / 100.0,
            total_requests: total,
            errors: total - successes,
            slow_requests: slow,
        }
    }
}

// =============================================================================
// Monitor
// =============================================================================

/// Thread-safe bounded metric store
#[derive(Debug)]
pub struct PerformanceMonitor {
    metrics: Mutex<VecDeque<PerformanceMetric>>,
    max_metrics: usize,
    slow_threshold_ms: u64,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_METRICS)
    }

    pub fn with_capacity(max_metrics: usize) -> Self {
        Self {
            metrics: Mutex::new(VecDeque::with_capacity(max_metrics.min(DEFAULT_MAX_METRICS))),
            max_metrics: max_metrics.max(1),
            slow_threshold_ms: DEFAULT_SLOW_THRESHOLD_MS,
        }
    }

    pub fn with_slow_threshold(mut self, threshold_ms: u64) -> Self {
        self.slow_threshold_ms = threshold_ms;
        self
    }

    pub fn record_metric(&self, metric: PerformanceMetric) {
        let mut metrics = self.metrics.lock();
        if metrics.len() == self.max_metrics {
            metrics.pop_front();
        }
        metrics.push_back(metric);
    }

    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.lock().is_empty()
    }

    /// Stats over every retained metric
    pub fn stats(&self) -> PerformanceStats {
        let metrics = self.metrics.lock();
        PerformanceStats::from_metrics(metrics.iter(), self.slow_threshold_ms)
    }

    /// Stats over metrics recorded within the last `window`
    pub fn stats_within(&self, window: Duration) -> PerformanceStats {
        let cutoff = Utc::now() - window;
        let metrics = self.metrics.lock();
        PerformanceStats::from_metrics(
            metrics.iter().filter(|m| m.timestamp >= cutoff),
            self.slow_threshold_ms,
        )
    }

    /// Stats for a single URL
    pub fn endpoint_stats(&self, url: &str) -> PerformanceStats {
        let metrics = self.metrics.lock();
        PerformanceStats::from_metrics(
            metrics.iter().filter(|m| m.url == url),
            self.slow_threshold_ms,
        )
    }

    /// Metrics slower than `threshold_ms`, or the monitor's threshold
    pub fn slow_requests(&self, threshold_ms: Option<u64>) -> Vec<PerformanceMetric> {
        let limit = threshold_ms.unwrap_or(self.slow_threshold_ms);
        self.metrics
            .lock()
            .iter()
            .filter(|m| m.duration_ms > limit)
            .cloned()
            .collect()
    }

    pub fn error_requests(&self) -> Vec<PerformanceMetric> {
        self.metrics
            .lock()
            .iter()
            .filter(|m| !m.success)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.metrics.lock().clear();
    }

    /// Copy of every retained metric, oldest first
    pub fn export(&self) -> Vec<PerformanceMetric> {
        self.metrics.lock().iter().cloned().collect()
    }
}
