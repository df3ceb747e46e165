//! Metadata lookups and job submission.

use crate::error::{Error, Result};
use crate::extractor::{ExtractionProfile, shape_metadata};
use crate::retry::retry;
use crate::types::{Event, JobId, JobRecord, MediaMetadata};
use std::sync::atomic::Ordering;

use super::JobManager;

impl JobManager {
    /// Look up title, duration and formats for `url` without creating a job
    ///
    /// Each attempt uses the next [`ExtractionProfile`]; only formats carrying
    /// both audio and video are returned, highest resolution first.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty URL, or the last attempt's
    /// error once the metadata retry policy is exhausted.
    pub async fn get_metadata(&self, url: &str) -> Result<MediaMetadata> {
        let url = validate_url(url)?;
        let metadata = self.fetch_metadata_with_retry(url).await?;
        Ok(shape_metadata(metadata))
    }

    /// Create a job for `url` and start its worker
    ///
    /// Returns as soon as the record is registered. An empty or missing
    /// `format` uses the configured default selector.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty URL and `Error::ShuttingDown`
    /// once shutdown has begun; no record is created in either case.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(manager: JobManager) -> Result<()> {
    /// let id = manager
    ///     .submit("https://youtube.com/watch?v=abcdefghijk", Some("best"))
    ///     .await?;
    /// let record = manager.progress(&id).await?;
    /// println!("{} {}%", record.state, record.progress);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, url: &str, format: Option<&str>) -> Result<JobId> {
        if !self.lifecycle.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        let url = validate_url(url)?;
        let format = match format.map(str::trim) {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => self.config.download.default_format.clone(),
        };

        let id = JobId::generate();
        self.registry
            .register(JobRecord::new(id.clone(), url, format.clone()))
            .await?;

        tracing::info!(job_id = %id, url, format = %format, "Job submitted");
        self.emit_event(Event::Queued {
            id: id.clone(),
            url: url.to_string(),
        });

        let manager = self.clone();
        let worker_id = id.clone();
        self.lifecycle
            .workers
            .spawn(async move { manager.run_job(worker_id).await });

        Ok(id)
    }

    /// Run the metadata lookup under the metadata retry policy, one profile per attempt
    pub(crate) async fn fetch_metadata_with_retry(&self, url: &str) -> Result<MediaMetadata> {
        retry(&self.config.retry.metadata, |attempt| {
            let profile = ExtractionProfile::for_attempt(attempt);
            tracing::debug!(url, attempt, profile = %profile, "Metadata attempt");
            self.extractor.fetch_metadata(url, profile)
        })
        .await
    }
}

fn validate_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput("URL is required".to_string()));
    }
    Ok(url)
}
