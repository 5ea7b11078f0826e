//! Ingestion error types

use thiserror::Error;
use webrank_common::errors::AppError;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Cannot read snapshot {path}: {message}")]
    SnapshotRead { path: String, message: String },

    #[error("Cannot write ranked pages to {path}: {message}")]
    OutputWrite { path: String, message: String },

    #[error("Search service error: {0}")]
    Service(AppError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<AppError> for IngestionError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Configuration { message } => IngestionError::ConfigError(message),
            other => IngestionError::Service(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let err: IngestionError = AppError::unavailable("connection refused").into();
        assert!(matches!(err, IngestionError::Service(AppError::ServiceUnavailable { .. })));

        let err: IngestionError = AppError::Configuration {
            message: "bad url".into(),
        }
        .into();
        assert!(matches!(err, IngestionError::ConfigError(_)));
    }
}
