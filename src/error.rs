//! Error types for filebrowser
//!
//! This module provides error handling for the library, including:
//! - Filesystem error kinds surfaced per batch item (not found, not a regular file, I/O)
//! - Task state machine violations
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::TaskId;

/// Result type alias for filebrowser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for filebrowser
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "hub.subscriber_buffer")
        key: Option<String>,
    },

    /// Path does not exist
    #[error("{} does not exist", path.display())]
    NotFound {
        /// The path that could not be found
        path: PathBuf,
    },

    /// Operation requires a plain file but got a directory or special file
    #[error("{} is not a regular file", path.display())]
    NotRegularFile {
        /// The offending path
        path: PathBuf,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempt to end a task that already ended
    #[error("task {id} has already ended")]
    InvalidTransition {
        /// The task that was ended twice
        id: TaskId,
    },

    /// Task not present in the registry
    #[error("task {id} not found")]
    TaskNotFound {
        /// The unknown task ID
        id: TaskId,
    },

    /// One or more items of a batch failed
    ///
    /// Carries the first failure observed (by completion order). The remaining
    /// per-item outcomes are recorded on the tasks.
    #[error("{item}: {source}")]
    Batch {
        /// Name of the item whose failure completed first
        item: String,
        /// The first failure
        #[source]
        source: Box<Error>,
        /// Number of items that failed
        failed: usize,
        /// Number of items in the batch
        total: usize,
    },

    /// Malformed request (bad multipart body, missing field, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new batches
    #[error("shutdown in progress: not accepting new operations")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map an I/O error on `path` to the matching domain error.
    ///
    /// `NotFound` keeps its own variant so callers and clients can tell a
    /// missing source apart from a failed write.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound { path: path.into() }
        } else {
            Error::Io(err)
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "not_found",
///     "message": "/docs/a.txt does not exist",
///     "details": {
///       "path": "/docs/a.txt"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always false; mirrors the `success` flag of successful responses
    #[serde(default)]
    pub success: bool,
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "batch_failed")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,

            // 404 Not Found
            Error::NotFound { .. } => 404,
            Error::TaskNotFound { .. } => 404,

            // 409 Conflict - task already in the requested state
            Error::InvalidTransition { .. } => 409,

            // 422 Unprocessable Entity - Semantic errors
            Error::NotRegularFile { .. } => 422,

            // A failed batch reports the status of its first failure
            Error::Batch { source, .. } => source.status_code(),

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::NotFound { .. } => "not_found",
            Error::NotRegularFile { .. } => "not_regular_file",
            Error::Io(_) => "io_error",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::TaskNotFound { .. } => "task_not_found",
            Error::Batch { .. } => "batch_failed",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::NotFound { path } | Error::NotRegularFile { path } => Some(serde_json::json!({
                "path": path,
            })),
            Error::InvalidTransition { id } | Error::TaskNotFound { id } => {
                Some(serde_json::json!({
                    "task_id": id,
                }))
            }
            Error::Batch {
                item,
                source,
                failed,
                total,
            } => Some(serde_json::json!({
                "item": item,
                "cause": source.error_code(),
                "failed": failed,
                "total": total,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            success: false,
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
