//! Error type system for Stockroom
//!
//! This module provides the crate-wide error type with:
//! - Classification of validation, credential, token and session failures
//! - HTTP status code mapping
//! - JSON error bodies carrying a trace ID

use crate::api::middleware::trace::current_trace_id;
use crate::auth::token::TokenError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single rejected form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the Stockroom system
#[derive(Debug, thiserror::Error)]
pub enum StockroomError {
    // System-level errors
    #[error("System initialization failed: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task error: {0}")]
    TaskError(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed: {}", format_fields(.0))]
    ValidationError(Vec<FieldError>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("Session could not be saved: {0}")]
    SessionSaveError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl StockroomError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            StockroomError::InvalidRequest(_) | StockroomError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }

            // 401 Unauthorized
            StockroomError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            StockroomError::Token(TokenError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            StockroomError::Token(_) => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            StockroomError::NotFound(_) => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            StockroomError::InitializationError(_)
            | StockroomError::ConfigError(_)
            | StockroomError::DatabaseError(_)
            | StockroomError::IoError(_)
            | StockroomError::TaskError(_)
            | StockroomError::DuplicateUsername(_)
            | StockroomError::HashingError(_)
            | StockroomError::SessionSaveError(_)
            | StockroomError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            StockroomError::InitializationError(_) => "InitializationError",
            StockroomError::ConfigError(_) => "ConfigError",
            StockroomError::DatabaseError(_) => "DatabaseError",
            StockroomError::IoError(_) => "IoError",
            StockroomError::TaskError(_) => "TaskError",
            StockroomError::InvalidRequest(_) => "InvalidRequest",
            StockroomError::ValidationError(_) => "ValidationError",
            StockroomError::NotFound(_) => "NotFound",
            StockroomError::InvalidCredentials => "InvalidCredentials",
            StockroomError::DuplicateUsername(_) => "DuplicateUsername",
            StockroomError::HashingError(_) => "HashingError",
            StockroomError::Token(e) => e.error_type(),
            StockroomError::SessionSaveError(_) => "SessionSaveError",
            StockroomError::SerializationError(_) => "SerializationError",
        }
    }

    /// Message safe to show to the client. Account and storage failures
    /// collapse to generic text.
    pub fn public_message(&self) -> String {
        match self {
            StockroomError::InvalidCredentials => "Invalid credentials".to_string(),
            StockroomError::DuplicateUsername(_) => "Failed to create user".to_string(),
            StockroomError::HashingError(_) => "Failed to hash password".to_string(),
            StockroomError::SessionSaveError(_) => "Failed to save session".to_string(),
            StockroomError::Token(TokenError::Signing(_)) => "Failed to generate token".to_string(),
            StockroomError::Token(_) => "Invalid or expired token".to_string(),
            StockroomError::DatabaseError(_)
            | StockroomError::IoError(_)
            | StockroomError::TaskError(_)
            | StockroomError::InitializationError(_)
            | StockroomError::ConfigError(_)
            | StockroomError::SerializationError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Unique trace ID for this error
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response tagged with the current request's trace
    /// ID, or a fresh one outside a request
    pub fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            details: None,
            trace_id: current_trace_id().unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }

    /// Create an error response with additional details
    pub fn with_details(error: String, message: String, details: serde_json::Value) -> Self {
        Self {
            details: Some(details),
            ..Self::new(error, message)
        }
    }

    /// Create an error response from a StockroomError
    pub fn from_error(error: &StockroomError) -> Self {
        let error_type = error.error_type().to_string();
        match error {
            StockroomError::ValidationError(fields) => Self::with_details(
                error_type,
                error.public_message(),
                serde_json::json!({ "errors": fields }),
            ),
            _ => Self::new(error_type, error.public_message()),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}{} (trace_id: {})",
            self.error,
            self.message,
            self.details.as_ref().map_or("", |_| " with details"),
            self.trace_id
        )
    }
}

impl IntoResponse for StockroomError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with StockroomError
pub type Result<T> = std::result::Result<T, StockroomError>;

/// Context extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| StockroomError::InitializationError(format!("{}: {}", context.into(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            StockroomError::ValidationError(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StockroomError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StockroomError::Token(TokenError::ExpiredOrInvalid).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StockroomError::Token(TokenError::Signing("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            StockroomError::SessionSaveError("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            StockroomError::NotFound("item".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StockroomError::DatabaseError(rusqlite::Error::InvalidQuery).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_duplicate_username_hides_name() {
        let err = StockroomError::DuplicateUsername("alice".into());
        let response = ErrorResponse::from_error(&err);

        assert_eq!(response.error, "DuplicateUsername");
        assert!(!response.message.contains("alice"));
    }

    #[test]
    fn test_validation_error_lists_fields() {
        let err = StockroomError::ValidationError(vec![FieldError::new(
            "password",
            "must be at least 8 characters",
        )]);
        let response = ErrorResponse::from_error(&err);

        let details = response.details.expect("validation errors carry details");
        assert_eq!(details["errors"][0]["field"], "password");
        assert!(response.message.contains("password"));
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = StockroomError::DatabaseError(rusqlite::Error::InvalidQuery);
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.message, "Internal server error");
        assert!(!response.trace_id.is_empty());
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));

        let err = result.context("Failed to open database").unwrap_err();
        assert!(err.to_string().contains("Failed to open database"));
        assert!(err.to_string().contains("file not found"));
    }
}
