//! Request Logger
//!
//! Emits API request/response events through `tracing` and, when storage
//! is enabled, keeps the most recent entries in memory for inspection.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

/// Default number of stored entries
pub const DEFAULT_MAX_STORAGE_ENTRIES: usize = 1000;

// =============================================================================
// Log Level
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

// =============================================================================
// Entries & Config
// =============================================================================

/// A stored log record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub context: Value,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Minimum level recorded
    pub level: LogLevel,
    /// Forward entries to the tracing subscriber
    pub enable_tracing: bool,
    /// Keep entries in memory
    pub enable_storage: bool,
    pub max_storage_entries: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            enable_tracing: true,
            enable_storage: false,
            max_storage_entries: DEFAULT_MAX_STORAGE_ENTRIES,
        }
    }
}

// =============================================================================
// Logger
// =============================================================================

#[derive(Debug, Default)]
pub struct RequestLogger {
    config: RwLock<LoggerConfig>,
    storage: Mutex<VecDeque<LogEntry>>,
}

impl RequestLogger {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config: RwLock::new(config),
            storage: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> LoggerConfig {
        self.config.read().clone()
    }

    pub fn update_config(&self, config: LoggerConfig) {
        let max = config.max_storage_entries;
        *self.config.write() = config;

        let mut storage = self.storage.lock();
        while storage.len() > max {
            storage.pop_front();
        }
    }

    pub fn debug(&self, message: &str, context: Value) {
        self.log(LogLevel::Debug, message, context, None);
    }

    pub fn info(&self, message: &str, context: Value) {
        self.log(LogLevel::Info, message, context, None);
    }

    pub fn warn(&self, message: &str, context: Value, err: Option<&dyn fmt::Display>) {
        self.log(LogLevel::Warn, message, context, err);
    }

    pub fn error(&self, message: &str, context: Value, err: Option<&dyn fmt::Display>) {
        self.log(LogLevel::Error, message, context, err);
    }

    /// Outgoing request
    pub fn log_request(&self, method: &str, url: &str, body: Option<&Value>) {
        let mut context = Map::new();
        context.insert("method".into(), json!(method.to_uppercase()));
        context.insert("url".into(), json!(url));
        if let Some(body) = body {
            context.insert("data".into(), body.clone());
        }
        self.debug("API Request", Value::Object(context));
    }

    /// Received response; statuses from 400 up are logged at warn
    pub fn log_response(&self, method: &str, url: &str, status: u16, duration_ms: u64) {
        let level = if status >= 400 {
            LogLevel::Warn
        } else {
            LogLevel::Debug
        };
        let context = json!({
            "method": method.to_uppercase(),
            "url": url,
            "status": status,
            "duration": format!("{}ms", duration_ms),
        });
        self.log(level, "API Response", context, None);
    }

    /// Request that failed without a usable response
    pub fn log_error(&self, method: &str, url: &str, err: &dyn fmt::Display, duration_ms: u64) {
        let context = json!({
            "method": method.to_uppercase(),
            "url": url,
            "duration": format!("{}ms", duration_ms),
        });
        self.log(LogLevel::Error, "API Error", context, Some(err));
    }

    /// Stored entries, optionally only those at `level`
    pub fn logs(&self, level: Option<LogLevel>) -> Vec<LogEntry> {
        self.storage
            .lock()
            .iter()
            .filter(|e| level.map_or(true, |l| e.level == l))
            .cloned()
            .collect()
    }

    pub fn clear_logs(&self) {
        self.storage.lock().clear();
    }

    fn log(&self, level: LogLevel, message: &str, context: Value, err: Option<&dyn fmt::Display>) {
        let config = self.config.read().clone();
        if level < config.level {
            return;
        }

        let error = err.map(|e| e.to_string());

        if config.enable_tracing {
            let err_text = error.as_deref().unwrap_or("");
            match level {
                LogLevel::Debug => debug!(context = %context, error = err_text, "{}", message),
                LogLevel::Info => info!(context = %context, error = err_text, "{}", message),
                LogLevel::Warn => warn!(context = %context, error = err_text, "{}", message),
                LogLevel::Error => error!(context = %context, error = err_text, "{}", message),
            }
        }

        if config.enable_storage {
            let mut storage = self.storage.lock();
            storage.push_back(LogEntry {
                level,
                message: message.to_string(),
                timestamp: Utc::now(),
                context,
                error,
            });
            while storage.len() > config.max_storage_entries {
                storage.pop_front();
            }
        }
    }
}
