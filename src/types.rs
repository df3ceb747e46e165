//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

use crate::error::JobError;

/// Progress ceiling for any record that is not yet `completed`
pub const MAX_ACTIVE_PROGRESS: u8 = 99;

/// Unique identifier for a job
///
/// Generated at submission from a random UUID and never taken from user input.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Registered, worker not yet running
    Pending,
    /// Worker running, preparing
    Starting,
    /// Looking up title and formats
    FetchingMetadata,
    /// Transferring bytes
    Downloading,
    /// Transfer finished, artifact being finalized
    Processing,
    /// Artifact materialized and fetchable
    Completed,
    /// Failed with error
    Error,
    /// Cancelled by a client
    Cancelled,
}

impl JobState {
    /// `completed`, `error` and `cancelled` never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Error | JobState::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    ///
    /// Any non-terminal state may be cancelled or fail; otherwise only the
    /// forward edges of the lifecycle are allowed.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobState::Cancelled | JobState::Error => true,
            _ => matches!(
                (self, next),
                (JobState::Pending, JobState::Starting)
                    | (JobState::Starting, JobState::FetchingMetadata)
                    | (JobState::FetchingMetadata, JobState::Downloading)
                    | (JobState::Downloading, JobState::Processing)
                    | (JobState::Processing, JobState::Completed)
            ),
        }
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Starting => "starting",
            JobState::FetchingMetadata => "fetching_metadata",
            JobState::Downloading => "downloading",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Error => "error",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one submitted job, as stored in the registry and returned to pollers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobRecord {
    /// Job identifier
    #[serde(rename = "download_id")]
    pub id: JobId,

    /// Lifecycle state
    #[serde(rename = "status")]
    pub state: JobState,

    /// Percentage in [0, 100]; 100 only once completed
    pub progress: u8,

    /// Human status line, replaced on every update
    pub message: String,

    /// Label of the current phase (e.g. "Downloading video")
    pub current_step: String,

    /// Media title, empty until metadata is known
    pub title: String,

    /// Source URL as submitted
    pub url: String,

    /// Format selector handed to the extractor
    pub format: String,

    /// Durable artifact location, present only while completed
    #[schema(value_type = Option<String>)]
    #[serde(rename = "file_path", skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,

    /// Estimated size while transferring, exact size once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Failure description, present only in state `error`
    pub error: Option<String>,

    /// When the job was submitted
    pub created_at: DateTime<Utc>,

    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// New `pending` record for a submission
    pub fn new(id: JobId, url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            id,
            state: JobState::Pending,
            progress: 0,
            message: "Download queued".to_string(),
            current_step: String::new(),
            title: String::new(),
            url: url.into(),
            format: format.into(),
            artifact_path: None,
            size_bytes: None,
            error: None,
            created_at: Utc::now(),
            terminal_at: None,
        }
    }

    /// Whether the record reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`, stamping `terminal_at` when it is terminal
    pub fn transition_to(&mut self, next: JobState) -> Result<(), JobError> {
        if !self.state.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.terminal_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Enter an active phase with its label, message and progress floor
    pub fn enter_phase(
        &mut self,
        next: JobState,
        step: &str,
        message: &str,
        floor: u8,
    ) -> Result<(), JobError> {
        self.transition_to(next)?;
        self.current_step = step.to_string();
        self.message = message.to_string();
        self.raise_progress(floor);
        Ok(())
    }

    /// Raise progress to `percent`, never lowering it and never reaching 100
    pub fn raise_progress(&mut self, percent: u8) {
        let capped = percent.min(MAX_ACTIVE_PROGRESS);
        self.progress = self.progress.max(capped);
    }

    /// Commit the materialized artifact
    pub fn complete(&mut self, artifact_path: PathBuf, size_bytes: u64) -> Result<(), JobError> {
        self.transition_to(JobState::Completed)?;
        self.progress = 100;
        self.current_step = "Download complete".to_string();
        self.message = "Media ready for download".to_string();
        self.artifact_path = Some(artifact_path);
        self.size_bytes = Some(size_bytes);
        Ok(())
    }

    /// Record a terminal failure
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), JobError> {
        self.transition_to(JobState::Error)?;
        let error = error.into();
        self.message = format!("Error: {error}");
        self.error = Some(error);
        Ok(())
    }

    /// Mark as cancelled
    pub fn cancel(&mut self) -> Result<(), JobError> {
        self.transition_to(JobState::Cancelled)?;
        self.message = "Download cancelled".to_string();
        Ok(())
    }
}

/// One selectable format of a media item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FormatInfo {
    /// Extractor-specific selector for this format
    pub format_id: String,
    /// Resolution or quality label (e.g. "1280x720", "720p")
    pub quality: String,
    /// Container extension
    pub ext: String,
    /// Size in bytes if the extractor reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    /// Extractor note (e.g. "medium")
    pub note: String,
    /// Video codec, "none" for audio-only formats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcodec: Option<String>,
    /// Audio codec, "none" for video-only formats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acodec: Option<String>,
}

impl FormatInfo {
    /// Whether the format carries both a video and an audio stream
    pub fn has_video_and_audio(&self) -> bool {
        self.vcodec.as_deref() != Some("none") && self.acodec.as_deref() != Some("none")
    }
}

/// Metadata returned by a lookup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaMetadata {
    /// Media title
    pub title: String,
    /// Thumbnail URL, empty if unknown
    pub thumbnail: String,
    /// Duration in seconds
    pub duration: u64,
    /// Uploader name
    pub uploader: String,
    /// View count
    pub view_count: u64,
    /// Like count
    pub like_count: u64,
    /// Selectable formats
    pub formats: Vec<FormatInfo>,
    /// Source URL the lookup ran against
    pub url: String,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job registered and worker launched
    Queued {
        /// Job ID
        id: JobId,
        /// Source URL
        url: String,
    },

    /// Job moved to a new lifecycle state
    StateChanged {
        /// Job ID
        id: JobId,
        /// New state
        state: JobState,
    },

    /// Transfer progress update
    Progress {
        /// Job ID
        id: JobId,
        /// Stored percentage after the update
        percent: u8,
        /// Transfer rate in bytes per second, if known
        #[serde(skip_serializing_if = "Option::is_none")]
        speed_bps: Option<f64>,
    },

    /// Artifact materialized
    Completed {
        /// Job ID
        id: JobId,
        /// Durable artifact location
        #[schema(value_type = String)]
        path: PathBuf,
        /// Exact artifact size
        size_bytes: u64,
    },

    /// Job ended in error
    Failed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// Job cancelled by a client
    Cancelled {
        /// Job ID
        id: JobId,
    },

    /// Job record and artifact reclaimed
    Expired {
        /// Job ID
        id: JobId,
    },

    /// Service is shutting down
    Shutdown,
}
