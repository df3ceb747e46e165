//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`]: metadata lookups, submission, polling, artifacts, cancellation
//! - [`system`]: index, health, sweeping, events, OpenAPI

use crate::types::{JobId, MediaMetadata};
use serde::{Deserialize, Serialize};

mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /info
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct InfoRequest {
    /// Source URL to look up
    #[serde(default)]
    pub url: String,
}

/// Response for POST /info
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct InfoResponse {
    /// Always true
    pub success: bool,
    /// Title, formats and the rest of the lookup
    #[serde(flatten)]
    pub metadata: MediaMetadata,
    /// Duration as `HH:MM:SS`
    pub duration_str: String,
}

/// Request body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Source URL to retrieve
    #[serde(default)]
    pub url: String,
    /// Format selector (default: the configured default format)
    pub format_id: Option<String>,
    /// Alias of `format_id`; wins when both are present
    pub quality: Option<String>,
}

/// Response for POST /download
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// Always true
    pub success: bool,
    /// Identifier to poll with
    pub download_id: JobId,
    /// Human-readable acknowledgement
    pub message: String,
}

/// Response for POST /cancel/:id
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    /// Always true
    pub success: bool,
    /// Human-readable acknowledgement
    pub message: String,
}

/// Body of GET /progress/:id for an unknown job
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProgressNotFound {
    /// Always "not_found"
    pub status: String,
    /// Always 0
    pub progress: u8,
    /// Always "Download not found"
    pub message: String,
}

/// Response for GET /health
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Current server time
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Jobs currently transferring bytes
    pub active_downloads: usize,
}

/// Format seconds as `HH:MM:SS`; hours are not wrapped at 24
pub fn format_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
