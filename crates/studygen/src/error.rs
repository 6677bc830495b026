//! Error types for the conversion service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for studygen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Studygen errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad input from a caller
    #[error("Validation error: {0}")]
    Validation(String),

    /// Task id not present in the registry
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Uploaded document or its extracted elements are missing
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Conversion of the requested type has not been generated yet
    #[error("Conversion '{flavor}' not found for {md5_name}")]
    ConversionNotFound { md5_name: String, flavor: String },

    /// Document extraction service error
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Generation (LLM) error
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Generated text could not be used at all
    #[error("Failed to parse generated output: {0}")]
    Parse(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable code stored in a failed task's `error_type` attribute
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Validation(_) => "validation_error",
            Error::TaskNotFound(_) => "no_task",
            Error::DocumentNotFound(_) => "no_file",
            Error::ConversionNotFound { .. } => "no_conversion",
            Error::Extraction(_) => "extraction_error",
            Error::Generation(_) => "generation_error",
            Error::Parse(_) => "parse_error",
            Error::Storage(_) => "storage_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::Validation(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::ConversionNotFound { .. } => StatusCode::BAD_REQUEST,
            Error::TaskNotFound(_) | Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            Error::Extraction(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Generation(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Parse(_) | Error::Storage(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_codes() {
        assert_eq!(Error::DocumentNotFound("abc".into()).error_type(), "no_file");
        assert_eq!(Error::generation("timeout").error_type(), "generation_error");
        assert_eq!(
            Error::ConversionNotFound {
                md5_name: "abc".into(),
                flavor: "test".into()
            }
            .error_type(),
            "no_conversion"
        );
    }

    #[test]
    fn test_response_status() {
        let response = Error::DocumentNotFound("abc".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = Error::validation("bad flavor").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
