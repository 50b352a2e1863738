//! Monitoring - request logging and performance metrics for the API client

pub mod logger;
pub mod performance;

pub use logger::{LogEntry, LogLevel, LoggerConfig, RequestLogger};
pub use performance::{PerformanceMetric, PerformanceMonitor, PerformanceStats};
