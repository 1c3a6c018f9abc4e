//! Error types for batch dispatch operations
//!
//! This module provides type-safe error handling for the batch dispatch core.
//!
//! # Error Codes
//!
//! Error codes are represented by the [`BatchErrorCode`] enum, which provides
//! exhaustive variants for the conditions the dispatcher distinguishes. When
//! serialized, codes are converted to SCREAMING_SNAKE_CASE strings.
//!
//! Structural codes ([`BatchErrorCode::UnknownMethod`],
//! [`BatchErrorCode::InvalidBase64`]) fail a whole batch; everything else is
//! absorbed into individual result slots.
//!
//! # Example
//! ```rust,ignore
//! use batch_request::{BatchError, BatchErrorCode};
//!
//! let error = BatchError::new(BatchErrorCode::UnknownMethod, "Unknown HTTP method");
//! let error = BatchError::unknown_method("banana"); // Convenience constructor
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Type-safe error codes for batch dispatch operations.
///
/// When serialized to JSON, codes are converted to SCREAMING_SNAKE_CASE
/// (e.g., `UnknownMethod` becomes `"UNKNOWN_METHOD"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchErrorCode {
    // Structural errors: the whole batch fails, no results are produced
    /// A descriptor's method is not a known HTTP verb
    UnknownMethod,
    /// A body declared as base64 could not be decoded
    InvalidBase64,

    // Per-slot errors: absorbed into the owning result slot
    /// A handler invocation returned an error or panicked
    HandlerFault,
    /// A handler invocation was cancelled before completion
    Cancelled,

    /// An unexpected internal error occurred
    InternalError,
    /// Configuration was rejected by validation
    InvalidConfig,
}

impl BatchErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownMethod => "UNKNOWN_METHOD",
            Self::InvalidBase64 => "INVALID_BASE64",
            Self::HandlerFault => "HANDLER_FAULT",
            Self::Cancelled => "CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::InvalidConfig => "INVALID_CONFIG",
        }
    }

    /// Returns true if this code invalidates a whole batch.
    ///
    /// Structural failures abort the entire call with no results; all other
    /// codes are mapped onto the result slot they occurred in.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::UnknownMethod | Self::InvalidBase64)
    }

    /// Returns true if this is a server-side failure (5xx equivalent).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::HandlerFault | Self::Cancelled | Self::InternalError
        )
    }
}

impl fmt::Display for BatchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Batch dispatch error with type-safe code and message.
///
/// # Example
/// ```rust,ignore
/// use batch_request::BatchError;
///
/// // Create with a convenience constructor
/// let error = BatchError::invalid_base64("not-base64!!");
///
/// // Add cause for debugging
/// let error = BatchError::internal("route table unavailable")
///     .with_cause("router collaborator returned an empty snapshot");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct BatchError {
    /// Type-safe error code
    pub code: BatchErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (JSON value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Optional cause for debugging (not exposed to clients in production)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl BatchError {
    /// Create a new error with code and message.
    pub fn new(code: BatchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            cause: None,
        }
    }

    /// Add details to the error.
    #[must_use = "This method returns a new BatchError and does not modify self"]
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Add a cause string for debugging.
    #[must_use = "This method returns a new BatchError and does not modify self"]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns true if this error invalidates a whole batch.
    pub fn is_structural(&self) -> bool {
        self.code.is_structural()
    }

    // Convenience constructors

    /// Create an UNKNOWN_METHOD error for an unrecognized HTTP verb.
    pub fn unknown_method(method: &str) -> Self {
        Self::new(
            BatchErrorCode::UnknownMethod,
            format!("'{}' is not a known HTTP method", method),
        )
    }

    /// Create an INVALID_BASE64 error carrying the offending text.
    pub fn invalid_base64(body: &str) -> Self {
        Self::new(
            BatchErrorCode::InvalidBase64,
            "Request body declared as base64 could not be decoded",
        )
        .with_details(serde_json::json!({ "body": body }))
    }

    /// Create a HANDLER_FAULT error.
    pub fn handler_fault(message: impl Into<String>) -> Self {
        Self::new(BatchErrorCode::HandlerFault, message)
    }

    /// Create a CANCELLED error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(BatchErrorCode::Cancelled, message)
    }

    /// Create an INTERNAL_ERROR error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(BatchErrorCode::InternalError, message)
    }

    /// Create an INVALID_CONFIG error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(BatchErrorCode::InvalidConfig, message)
    }
}

/// Result type alias for batch dispatch operations.
pub type DispatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_as_str() {
        assert_eq!(BatchErrorCode::UnknownMethod.as_str(), "UNKNOWN_METHOD");
        assert_eq!(BatchErrorCode::InvalidBase64.as_str(), "INVALID_BASE64");
        assert_eq!(BatchErrorCode::HandlerFault.as_str(), "HANDLER_FAULT");
    }

    #[test]
    fn test_structural_classification() {
        assert!(BatchErrorCode::UnknownMethod.is_structural());
        assert!(BatchErrorCode::InvalidBase64.is_structural());
        assert!(!BatchErrorCode::HandlerFault.is_structural());
        assert!(!BatchErrorCode::Cancelled.is_structural());
        assert!(!BatchErrorCode::InternalError.is_structural());
    }

    #[test]
    fn test_server_error_classification() {
        assert!(BatchErrorCode::HandlerFault.is_server_error());
        assert!(BatchErrorCode::InternalError.is_server_error());
        assert!(!BatchErrorCode::UnknownMethod.is_server_error());
    }

    #[test]
    fn test_invalid_base64_carries_offending_text() {
        let error = BatchError::invalid_base64("not-base64!!");
        assert_eq!(error.code, BatchErrorCode::InvalidBase64);
        let details = error.details.expect("details should be set");
        assert_eq!(details["body"], "not-base64!!");
    }

    #[test]
    fn test_display_format() {
        let error = BatchError::unknown_method("banana");
        let rendered = error.to_string();
        assert!(rendered.starts_with("[UNKNOWN_METHOD]"));
        assert!(rendered.contains("banana"));
    }

    #[test]
    fn test_serialization_uses_screaming_snake_case() {
        let error = BatchError::handler_fault("boom");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "HANDLER_FAULT");
        assert_eq!(json["message"], "boom");
        assert!(json.get("details").is_none());
    }
}
