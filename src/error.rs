//! Error types for the SwipeFeed engine
//!
//! One error enum for the whole crate:
//! - `thiserror` derives for display and source chaining
//! - axum extractor rejections folded into `InvalidArgument`
//! - domain variants the feed core raises (`NotFound`, `InvalidArgument`, `Storage`)
//! - HTTP status code mapping for API responses

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

/// Result type alias for SwipeFeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SwipeFeed engine
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Configuration error: {message}")]
    Config {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: &'static str },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig {
        key: &'static str,
        message: Cow<'static, str>,
    },

    // ========================================================================
    // Domain Errors
    // ========================================================================
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: Cow<'static, str> },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    #[error("Storage error: {message}")]
    Storage {
        message: Cow<'static, str>,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("Database connection pool exhausted")]
    PoolExhausted,

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: Cow<'static, str> },

    #[error("Migration error: {0}")]
    Migration(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Internal server error")]
    Internal {
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    // ========================================================================
    // Constructors for common error patterns
    // ========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with source
    pub fn storage_with_source(message: impl Into<Cow<'static, str>>, source: sqlx::Error) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal {
            source: Some(Box::new(source)),
        }
    }

    // ========================================================================
    // Error Classification
    // ========================================================================

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Storage { .. } | Error::PoolExhausted
        )
    }

    /// Returns true if this error should be logged at error level
    pub fn is_error_level(&self) -> bool {
        matches!(
            self,
            Error::Storage { .. } | Error::Internal { .. } | Error::Migration(_)
        )
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConstraintViolation { .. } => StatusCode::CONFLICT,
            Error::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::MissingEnvVar { .. } | Error::InvalidConfig { .. } => {
                "CONFIG_ERROR"
            }
            Error::NotFound { .. } => "NOT_FOUND",
            Error::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Error::Storage { .. } | Error::PoolExhausted | Error::Migration(_) => {
                "STORAGE_ERROR"
            }
            Error::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// Error Response for API
// ============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_error_level() {
            tracing::error!("Request failed: {:?}", self);
        }

        // Don't expose internal error details
        let message = if status.is_server_error() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// From implementations for external error types
// ============================================================================

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => Error::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return Error::ConstraintViolation {
                        message: format!("Constraint '{}' violated", constraint).into(),
                    };
                }
                Error::Storage {
                    message: db_err.message().to_string().into(),
                    source: Some(err),
                }
            }
            _ => Error::Storage {
                message: err.to_string().into(),
                source: Some(err),
            },
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::invalid_argument(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::invalid_argument(rejection.body_text())
    }
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::Config {
            message: "Environment variable error".into(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(Error::PoolExhausted.is_retryable());
        assert!(Error::storage("disk full").is_retryable());
        assert!(!Error::not_found("post", "123").is_retryable());
        assert!(!Error::invalid_argument("bad direction").is_retryable());
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::not_found("post", "123").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::invalid_argument("invalid").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Internal { source: None }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::storage("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::not_found("user", "u1").error_code(), "NOT_FOUND");
        assert_eq!(Error::invalid_argument("x").error_code(), "INVALID_ARGUMENT");
        assert_eq!(Error::storage("x").error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_sqlx_pool_timeout_maps_to_pool_exhausted() {
        let err: Error = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, Error::PoolExhausted));
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("post", "42");
        assert_eq!(err.to_string(), "Entity not found: post with id 42");
    }
}
