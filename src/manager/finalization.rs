//! Moving the transferred file into place and committing completion.

use crate::error::{JobError, Result};
use crate::types::{Event, JobId, JobState};
use crate::utils::{artifact_file_name, move_file, remove_file_if_exists};
use std::path::Path;

use super::JobManager;

impl JobManager {
    /// Move `produced` into the download directory and commit `completed`
    ///
    /// The commit re-checks the record under the registry lock: if the job was
    /// cancelled or removed while the file was being moved, the moved file is
    /// deleted and the record is left as it is. Failures are not retried.
    ///
    /// # Errors
    ///
    /// Returns `JobError::FinalizeFailed` if the file cannot be moved, its size
    /// cannot be read, or the record refuses the commit. No artifact is left
    /// behind in any of these cases.
    pub(crate) async fn finalize(&self, id: &JobId, title: &str, produced: &Path) -> Result<()> {
        let ext = produced
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&self.config.download.merge_output_format)
            .to_ascii_lowercase();
        let destination = self
            .config
            .download_dir()
            .join(artifact_file_name(title, id.as_str(), &ext));

        tracing::debug!(job_id = %id, source = ?produced, ?destination, "Finalizing artifact");

        if let Err(e) = move_file(produced, &destination).await {
            self.discard(id, &destination).await;
            return Err(finalize_failed(id, format!("moving {produced:?}: {e}")));
        }

        let size_bytes = match tokio::fs::metadata(&destination).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.discard(id, &destination).await;
                return Err(finalize_failed(id, format!("reading size: {e}")));
            }
        };

        let committed = self
            .registry
            .update(id, |r| {
                if r.is_terminal() {
                    return Ok(false);
                }
                r.complete(destination.clone(), size_bytes).map(|()| true)
            })
            .await;

        match committed {
            Ok(Ok(true)) => {
                tracing::info!(job_id = %id, path = ?destination, size_bytes, "Job completed");
                self.emit_event(Event::StateChanged {
                    id: id.clone(),
                    state: JobState::Completed,
                });
                self.emit_event(Event::Completed {
                    id: id.clone(),
                    path: destination,
                    size_bytes,
                });
                Ok(())
            }
            Ok(Ok(false)) | Err(JobError::NotFound { .. }) => {
                tracing::info!(job_id = %id, "Job ended before commit, discarding artifact");
                self.discard(id, &destination).await;
                Ok(())
            }
            Ok(Err(e)) | Err(e) => {
                self.discard(id, &destination).await;
                Err(finalize_failed(id, e.to_string()))
            }
        }
    }

    async fn discard(&self, id: &JobId, path: &Path) {
        if let Err(e) = remove_file_if_exists(path).await {
            tracing::warn!(job_id = %id, ?path, error = %e, "Failed to delete discarded artifact");
        }
    }
}

fn finalize_failed(id: &JobId, reason: String) -> crate::Error {
    JobError::FinalizeFailed {
        id: id.clone(),
        reason,
    }
    .into()
}
