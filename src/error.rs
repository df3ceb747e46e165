//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Job, Extraction, Config, etc.)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{JobId, JobState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Job lifecycle error
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Request rejected before any job was created
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The extractor reported a failure (metadata lookup or transfer)
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// External tool could not be run (yt-dlp missing, crashed, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Job-related errors
#[derive(Debug, Error)]
pub enum JobError {
    /// No live record carries this identifier
    #[error("job {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: JobId,
    },

    /// Cannot perform operation in current state
    #[error("cannot {operation} job {id} in state {current_state}")]
    InvalidState {
        /// The job ID that is in an invalid state for the operation
        id: JobId,
        /// The operation that was attempted (e.g., "cancel", "fetch")
        operation: String,
        /// The current state that prevents the operation
        current_state: JobState,
    },

    /// A state change outside the lifecycle table was attempted
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The job whose record rejected the change
        id: JobId,
        /// State the record is in
        from: JobState,
        /// State that was requested
        to: JobState,
    },

    /// Registry already holds a record under this identifier
    #[error("job {id} is already registered")]
    DuplicateId {
        /// The colliding identifier
        id: JobId,
    },

    /// Job is completed but its artifact is no longer on disk
    #[error("artifact for job {id} missing at {path}")]
    ArtifactMissing {
        /// The job ID whose artifact is gone
        id: JobId,
        /// Where the artifact was expected
        path: PathBuf,
    },

    /// Moving the transferred file to its durable location failed
    #[error("finalizing job {id} failed: {reason}")]
    FinalizeFailed {
        /// The job ID that failed to finalize
        id: JobId,
        /// The reason finalization failed
        reason: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It carries the explicit `success` flag clients check first.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "job_not_found",
///     "message": "job error: job 1b4e... not found",
///     "details": {
///       "job_id": "1b4e..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always false
    pub success: bool,
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
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
            Error::InvalidInput(_) => 400,

            // 404 Not Found
            Error::Job(JobError::NotFound { .. }) => 404,
            Error::Job(JobError::ArtifactMissing { .. }) => 404,

            // 409 Conflict - Operation not valid for the job's state
            Error::Job(JobError::InvalidState { .. }) => 409,
            Error::Job(JobError::InvalidTransition { .. }) => 409,
            Error::Job(JobError::DuplicateId { .. }) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Job(JobError::FinalizeFailed { .. }) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,

            // 502 Bad Gateway - Upstream refused or failed
            Error::Extraction(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,

            // 501 Not Implemented - Feature not supported
            Error::NotSupported(_) => 501,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Job(e) => match e {
                JobError::NotFound { .. } => "job_not_found",
                JobError::InvalidState { .. } => "invalid_state",
                JobError::InvalidTransition { .. } => "invalid_transition",
                JobError::DuplicateId { .. } => "duplicate_id",
                JobError::ArtifactMissing { .. } => "artifact_missing",
                JobError::FinalizeFailed { .. } => "finalize_failed",
            },
            Error::InvalidInput(_) => "validation_error",
            Error::Extraction(_) => "extraction_error",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Job(JobError::NotFound { id }) | Error::Job(JobError::DuplicateId { id }) => {
                Some(serde_json::json!({
                    "job_id": id,
                }))
            }
            Error::Job(JobError::InvalidState {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "job_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::Job(JobError::InvalidTransition { id, from, to }) => Some(serde_json::json!({
                "job_id": id,
                "from": from,
                "to": to,
            })),
            Error::Job(JobError::ArtifactMissing { id, path }) => Some(serde_json::json!({
                "job_id": id,
                "path": path,
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
