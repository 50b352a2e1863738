//! Error types for the product catalog
//!
//! Provides structured error types for every layer: domain validation,
//! use-case lookups, the HTTP API client and credential refresh.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Validation Errors
// =============================================================================

/// A single violated constraint on an input field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Invalid domain data rejected at the entity boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Error for a single field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation::new(field, message)],
        }
    }

    /// Whether the given field is among the violations
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Shape of an error body returned by the catalog API
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    code: Option<String>,
    details: Option<serde_json::Value>,
}

/// HTTP or network failure reported by the API client
///
/// `status` is 0 when no response was received.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("API error {status} ({code}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub const NETWORK_ERROR: &'static str = "NETWORK_ERROR";
    pub const TIMEOUT: &'static str = "TIMEOUT";
    pub const REQUEST_SETUP_ERROR: &'static str = "REQUEST_SETUP_ERROR";
    pub const DECODE_ERROR: &'static str = "DECODE_ERROR";

    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Build from a non-2xx response, using the `{message, code, details}`
    /// body when the server sent one.
    pub fn from_response(status: u16, body: &[u8], fallback_message: &str) -> Self {
        let parsed: ErrorResponse = serde_json::from_slice(body).unwrap_or_default();
        Self {
            status,
            code: parsed.code.unwrap_or_else(|| format!("HTTP_{}", status)),
            message: parsed
                .message
                .unwrap_or_else(|| fallback_message.to_string()),
            details: parsed.details,
        }
    }

    /// Request was sent but no response arrived
    pub fn network(message: impl fmt::Display) -> Self {
        Self::new(
            0,
            Self::NETWORK_ERROR,
            "Network error: Unable to reach the server",
        )
        .with_details(serde_json::json!({ "cause": message.to_string() }))
    }

    /// Transport timeout elapsed
    pub fn timeout(message: impl fmt::Display) -> Self {
        Self::new(0, Self::TIMEOUT, "Request timed out")
            .with_details(serde_json::json!({ "cause": message.to_string() }))
    }

    /// Request could not be built
    pub fn setup(message: impl fmt::Display) -> Self {
        Self::new(0, Self::REQUEST_SETUP_ERROR, "Error setting up the request")
            .with_details(serde_json::json!({ "message": message.to_string() }))
    }

    /// Successful response whose body did not match the expected type
    pub fn decode(status: u16, message: impl fmt::Display) -> Self {
        Self::new(status, Self::DECODE_ERROR, message.to_string())
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err)
        } else if err.is_builder() {
            Self::setup(err)
        } else if let Some(status) = err.status() {
            Self::new(status.as_u16(), format!("HTTP_{}", status.as_u16()), err.to_string())
        } else {
            Self::network(err)
        }
    }

    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Network and 5xx failures may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        self.is_network_error() || self.is_server_error()
    }

    /// Status as seen by the retry policy; `None` for network failures
    pub fn status_code(&self) -> Option<u16> {
        (self.status != 0).then_some(self.status)
    }
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Access-token refresh failure; credentials are cleared when raised
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Cannot refresh token: missing refresh endpoint or refresh token")]
    MissingRefreshCredentials,

    #[error("Token refresh failed with status {status}")]
    RefreshRejected { status: u16 },

    #[error("Token refresh request failed: {0}")]
    Transport(String),

    #[error("Token refresh response invalid: {0}")]
    InvalidResponse(String),

    #[error("Invalid credential header: {0}")]
    InvalidHeader(String),
}

// =============================================================================
// Unified Error
// =============================================================================

/// Unified error type for the catalog
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    // =========================================================================
    // Client Errors
    // =========================================================================
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Product lookup that found nothing
    pub fn product_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "Product".into(),
            id: id.into(),
        }
    }

    /// Check if this error is retryable under the retry policy
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Auth failures mean "re-authenticate", never "try again"
    pub fn requires_reauthentication(&self) -> bool {
        match self {
            Error::Auth(_) => true,
            Error::Api(err) => err.is_unauthorized(),
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Result type alias for the catalog
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_from_json_body() {
        let body = br#"{"message":"Price too low","code":"INVALID_PRICE","details":{"min":1}}"#;
        let err = ApiError::from_response(422, body, "Unprocessable Entity");
        assert_eq!(err.status, 422);
        assert_eq!(err.code, "INVALID_PRICE");
        assert_eq!(err.message, "Price too low");
        assert_eq!(err.details, Some(serde_json::json!({ "min": 1 })));
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_api_error_from_plain_body() {
        let err = ApiError::from_response(503, b"upstream down", "Service Unavailable");
        assert_eq!(err.code, "HTTP_503");
        assert_eq!(err.message, "Service Unavailable");
        assert!(err.is_server_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_network_error_has_zero_status() {
        let err = ApiError::network("connection refused");
        assert_eq!(err.status, 0);
        assert_eq!(err.status_code(), None);
        assert!(err.is_network_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_retryable() {
        let transient: Error = ApiError::new(500, "HTTP_500", "boom").into();
        assert!(transient.is_retryable());

        let not_found: Error = ApiError::new(404, "HTTP_404", "missing").into();
        assert!(!not_found.is_retryable());

        let auth: Error = AuthError::RefreshRejected { status: 401 }.into();
        assert!(!auth.is_retryable());
        assert!(auth.requires_reauthentication());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            violations: vec![
                FieldViolation::new("price", "must be positive"),
                FieldViolation::new("stock", "must be >= 0"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Validation failed: price: must be positive; stock: must be >= 0"
        );
        assert!(err.has_field("stock"));
        assert!(!err.has_field("rank"));
    }
}
