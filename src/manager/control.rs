//! Job control: polling, cancellation, artifact access and sweeping.

use crate::error::{Error, JobError, Result};
use crate::expiry::SweepReport;
use crate::types::{Event, JobId, JobRecord, JobState};
use crate::utils::content_disposition;
use std::path::PathBuf;
use std::time::Duration;

use super::JobManager;

/// An opened artifact, ready to be streamed to a client
#[derive(Debug)]
pub struct Artifact {
    /// Open handle positioned at the start of the file
    pub file: tokio::fs::File,
    /// Durable location on disk
    pub path: PathBuf,
    /// Exact size in bytes
    pub size_bytes: u64,
    /// `Content-Disposition` header value offering `<title>.<ext>`
    pub content_disposition: String,
}

impl JobManager {
    /// Snapshot of a job record
    ///
    /// Reads never change the record, so repeated polls of a terminal job
    /// return identical snapshots.
    ///
    /// # Errors
    ///
    /// Returns `JobError::NotFound` for an unknown or expired identifier.
    pub async fn progress(&self, id: &JobId) -> Result<JobRecord> {
        Ok(self.registry.get(id).await?)
    }

    /// Cancel a job
    ///
    /// Cancellation is cooperative: a transfer already in flight runs to its
    /// end, but its result is discarded and the record stays `cancelled`.
    /// A job that already finished (completed, failed or cancelled) is
    /// acknowledged and left untouched.
    ///
    /// # Errors
    ///
    /// Returns `JobError::NotFound` if the job doesn't exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(manager: JobManager, id: JobId) -> Result<()> {
    /// manager.cancel(&id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: &JobId) -> Result<()> {
        let changed = self
            .registry
            .update(id, |record| {
                if record.is_terminal() {
                    return Ok(false);
                }
                record.cancel().map(|()| true)
            })
            .await??;

        if changed {
            tracing::info!(job_id = %id, "Job cancelled");
            self.emit_event(Event::Cancelled { id: id.clone() });
            self.expiry.schedule(id.clone(), self.config.expiry.ttl);
        }
        Ok(())
    }

    /// Open the artifact of a completed job and start its expiry countdown
    ///
    /// The countdown starts on the first successful open only; later opens
    /// within the TTL reuse the same deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The job doesn't exist
    /// - The job is not `completed`
    /// - The artifact is no longer on disk
    pub async fn open_artifact(&self, id: &JobId) -> Result<Artifact> {
        let record = self.registry.get(id).await?;
        let path = match (record.state, record.artifact_path) {
            (JobState::Completed, Some(path)) => path,
            (state, _) => {
                return Err(JobError::InvalidState {
                    id: id.clone(),
                    operation: "fetch".to_string(),
                    current_state: state,
                }
                .into());
            }
        };

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(job_id = %id, path = ?path, "Artifact missing on disk");
                return Err(JobError::ArtifactMissing {
                    id: id.clone(),
                    path,
                }
                .into());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let size_bytes = file.metadata().await?.len();

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&self.config.download.merge_output_format)
            .to_string();
        let title = if record.title.is_empty() {
            id.as_str()
        } else {
            record.title.as_str()
        };

        self.expiry.schedule(id.clone(), self.config.expiry.ttl);
        tracing::debug!(job_id = %id, size_bytes, "Artifact opened");

        Ok(Artifact {
            file,
            content_disposition: content_disposition(title, &ext),
            path,
            size_bytes,
        })
    }

    /// Evict terminal jobs older than the configured sweep threshold
    ///
    /// # Errors
    ///
    /// Returns `Error::ShuttingDown` once the expiry scheduler has stopped.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        self.sweep_older_than(self.config.expiry.sweep_threshold)
            .await
    }

    /// Evict terminal jobs whose terminal timestamp is older than `older_than`
    ///
    /// # Errors
    ///
    /// Returns `Error::ShuttingDown` once the expiry scheduler has stopped.
    pub async fn sweep_older_than(&self, older_than: Duration) -> Result<SweepReport> {
        self.expiry
            .sweep(older_than)
            .await
            .ok_or(Error::ShuttingDown)
    }

    /// Number of jobs currently transferring bytes
    pub async fn active_downloads(&self) -> usize {
        self.registry.count_in_state(JobState::Downloading).await
    }
}
