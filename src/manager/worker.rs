//! Per-job worker task.
//!
//! One task per submission drives the record from `pending` to a terminal
//! state. Every phase change is a single registry update that first checks
//! whether the job was cancelled in the meantime; a cancelled job makes the
//! worker stop at its next step without touching the record again.

use crate::error::{Error, JobError, Result};
use crate::extractor::{ExtractionProfile, TransferRequest};
use crate::progress::{AttemptSink, ProgressSink, TransferSample};
use crate::retry::retry;
use crate::types::{Event, JobId, JobRecord, JobState};
use crate::utils::remove_dir_if_exists;
use std::path::{Path, PathBuf};

use super::JobManager;

impl JobManager {
    /// Worker entry point; never fails, every error becomes an `error` transition
    pub(crate) async fn run_job(&self, id: JobId) {
        let work_dir = self.config.temp_dir().join(id.as_str());
        tracing::debug!(job_id = %id, ?work_dir, "Worker started");

        if let Err(e) = self.drive(&id, &work_dir).await {
            self.fail_job(&id, &e).await;
        }

        if let Err(e) = remove_dir_if_exists(&work_dir).await {
            tracing::warn!(job_id = %id, ?work_dir, error = %e, "Failed to remove work directory");
        }

        self.expiry.schedule(id, self.config.expiry.ttl);
    }

    async fn drive(&self, id: &JobId, work_dir: &Path) -> Result<()> {
        if !self
            .advance(
                id,
                JobState::Starting,
                "Preparing download",
                "Initializing download...",
                5,
            )
            .await?
        {
            return Ok(());
        }

        if !self
            .advance(
                id,
                JobState::FetchingMetadata,
                "Fetching video information",
                "Getting video details...",
                10,
            )
            .await?
        {
            return Ok(());
        }

        let record = self.registry.get(id).await?;
        let metadata = self.fetch_metadata_with_retry(&record.url).await?;
        let title = metadata.title;
        self.registry
            .update(id, |r| {
                if !r.is_terminal() {
                    r.title.clone_from(&title);
                }
            })
            .await?;
        tracing::info!(job_id = %id, title = %title, "Metadata fetched");

        if !self
            .advance(
                id,
                JobState::Downloading,
                "Starting download",
                "Beginning download process...",
                15,
            )
            .await?
        {
            return Ok(());
        }

        let sink = self.progress_sink();
        let Some(produced) = self.transfer_with_retry(&record, work_dir, &sink).await? else {
            tracing::info!(job_id = %id, "Job no longer active, skipping transfer");
            return Ok(());
        };

        sink.report(id, TransferSample::Finished).await;

        self.finalize(id, &title, &produced).await
    }

    /// Enter the next active phase unless the job already reached a terminal state
    ///
    /// Returns `Ok(false)` when the worker should stop quietly.
    async fn advance(
        &self,
        id: &JobId,
        next: JobState,
        step: &str,
        message: &str,
        floor: u8,
    ) -> Result<bool> {
        let entered = self
            .registry
            .update(id, |r| {
                if r.is_terminal() {
                    return Ok(false);
                }
                r.enter_phase(next, step, message, floor).map(|()| true)
            })
            .await;

        match entered {
            Ok(Ok(true)) => {
                tracing::debug!(job_id = %id, state = %next, "Job advanced");
                self.emit_event(Event::StateChanged {
                    id: id.clone(),
                    state: next,
                });
                Ok(true)
            }
            Ok(Ok(false)) | Err(JobError::NotFound { .. }) => {
                tracing::debug!(job_id = %id, "Job no longer active, worker stopping");
                Ok(false)
            }
            Ok(Err(e)) | Err(e) => Err(e.into()),
        }
    }

    /// Run the transfer under the download retry policy
    ///
    /// Each attempt starts from an empty work directory and reports through an
    /// [`AttemptSink`], so the record stays `downloading` until an attempt
    /// succeeds. Returns `Ok(None)` if the job was cancelled before an attempt
    /// began.
    async fn transfer_with_retry(
        &self,
        record: &JobRecord,
        work_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<Option<PathBuf>> {
        retry(&self.config.retry.download, move |attempt| async move {
            if self.is_finished(&record.id).await {
                return Ok(None);
            }

            remove_dir_if_exists(work_dir).await?;
            tokio::fs::create_dir_all(work_dir).await?;

            let request = TransferRequest {
                id: record.id.clone(),
                url: record.url.clone(),
                format: record.format.clone(),
                output_dir: work_dir.to_path_buf(),
                merge_output_format: self.config.download.merge_output_format.clone(),
                profile: ExtractionProfile::Mobile,
            };
            tracing::debug!(job_id = %record.id, attempt, format = %record.format, "Transfer attempt");

            self.extractor
                .download(&request, &AttemptSink::new(sink))
                .await
                .map(Some)
        })
        .await
    }

    async fn is_finished(&self, id: &JobId) -> bool {
        self.registry
            .get(id)
            .await
            .map(|r| r.is_terminal())
            .unwrap_or(true)
    }

    /// Record `error` as the job's terminal failure
    ///
    /// A job that is already terminal (typically cancelled) keeps its state.
    pub(crate) async fn fail_job(&self, id: &JobId, error: &Error) {
        let message = failure_message(error);

        match self.registry.update(id, |r| r.fail(message.clone())).await {
            Ok(Ok(())) => {
                tracing::error!(job_id = %id, error = %message, "Job failed");
                self.emit_event(Event::Failed {
                    id: id.clone(),
                    error: message,
                });
            }
            Ok(Err(e)) => {
                tracing::debug!(job_id = %id, error = %e, "Dropping failure of finished job");
            }
            Err(e) => {
                tracing::debug!(job_id = %id, error = %e, "Dropping failure of removed job");
            }
        }
    }
}

/// Message stored on the record; extractor failures are kept verbatim
fn failure_message(error: &Error) -> String {
    match error {
        Error::Extraction(message) => message.clone(),
        Error::Job(JobError::FinalizeFailed { reason, .. }) => {
            format!("Failed to finalize download: {reason}")
        }
        other => other.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failures_are_stored_verbatim() {
        let msg = failure_message(&Error::Extraction("Video unavailable".into()));
        assert_eq!(msg, "Video unavailable");
    }

    #[test]
    fn finalize_failures_carry_reason() {
        let msg = failure_message(&Error::Job(JobError::FinalizeFailed {
            id: JobId::from("x"),
            reason: "disk full".into(),
        }));
        assert_eq!(msg, "Failed to finalize download: disk full");
    }

    #[test]
    fn other_failures_use_display() {
        let msg = failure_message(&Error::NotSupported("no yt-dlp".into()));
        assert_eq!(msg, "not supported: no yt-dlp");
    }
}
