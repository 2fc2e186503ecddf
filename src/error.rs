// Error handling module
// Defines error types and server error body conversion

use serde_json::Value;
use thiserror::Error;

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (HTTP 401)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Permission denied (HTTP 403)
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Too many requests (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Connectivity failure: no HTTP response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-success response from the DriveHub API
    #[error("API error: {status} - {detail}")]
    Api { status: u16, detail: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Builds the error matching a non-success HTTP status, surfacing the
    /// server-provided detail message verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = extract_detail(body)
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        match status {
            401 => ApiError::Unauthorized(detail),
            403 => ApiError::Forbidden(detail),
            429 => ApiError::RateLimited(detail),
            _ => ApiError::Api { status, detail },
        }
    }

    /// HTTP status associated with this error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::RateLimited(_) => Some(429),
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extracts the `detail` field from a FastAPI-style error body.
///
/// Handles both shapes the server produces: a plain string detail and the
/// validation-error array (`[{"loc": ..., "msg": ..., "type": ...}]`), whose
/// messages are joined into one line.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
