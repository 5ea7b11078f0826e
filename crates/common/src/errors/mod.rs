//! Error types for WebRank
//!
//! Provides a single error enum shared by the ranking library and binaries:
//! - Distinct error types for different failure modes
//! - Numeric error codes for logs and exit reporting
//! - Classification helpers (service vs. caller errors)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidInput,
    InvalidFormat,

    // Authentication errors (2xxx)
    Unauthorized,

    // Resource errors (4xxx)
    UserNotFound,

    // Conflict errors (5xxx)
    DuplicateUser,

    // Storage errors (7xxx)
    StorageError,

    // External service errors (8xxx)
    UpstreamError,
    BulkIndexError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidInput => 1002,
            ErrorCode::InvalidFormat => 1003,

            ErrorCode::Unauthorized => 2001,

            ErrorCode::UserNotFound => 4002,

            ErrorCode::DuplicateUser => 5002,

            ErrorCode::StorageError => 7001,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::BulkIndexError => 8002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Resource errors
    #[error("User not found: {username}")]
    UserNotFound { username: String },

    // Conflict errors
    #[error("User already exists: {username}")]
    DuplicateUser { username: String },

    // Storage errors
    #[error("Storage error at {path}: {message}")]
    Storage { path: String, message: String },

    // External service errors
    #[error("Search service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Bulk indexing failed: {message}")]
    BulkIndex { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidInput { .. } => ErrorCode::InvalidInput,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::UserNotFound { .. } => ErrorCode::UserNotFound,
            AppError::DuplicateUser { .. } => ErrorCode::DuplicateUser,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::BulkIndex { .. } => ErrorCode::BulkIndexError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
        }
    }

    /// Wrap any service-side failure as `ServiceUnavailable`.
    ///
    /// Query-time callers never see transport details, only that the
    /// search service could not answer.
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        AppError::ServiceUnavailable {
            message: err.to_string()
        }
    }

    /// Check if the failure originated in the external search service
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            AppError::ServiceUnavailable { .. }
                | AppError::Upstream { .. }
                | AppError::BulkIndex { .. }
                | AppError::HttpClient(_)
        )
    }

    /// Check if this error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::InvalidInput { .. }
                | AppError::InvalidFormat { .. }
                | AppError::Unauthorized { .. }
                | AppError::UserNotFound { .. }
                | AppError::DuplicateUser { .. }
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DuplicateUser { username: "alice".into() };
        assert_eq!(err.code(), ErrorCode::DuplicateUser);
        assert_eq!(err.code().as_code(), 5002);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unavailable_wraps_message() {
        let err = AppError::unavailable("connection refused");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert!(err.is_service_error());
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Service unavailable: connection refused");
    }

    #[test]
    fn test_invalid_input() {
        let err = AppError::InvalidInput {
            message: "cannot normalize an empty list".into()
        };
        assert_eq!(err.code().as_code(), 1002);
        assert!(err.is_client_error());
    }
}
