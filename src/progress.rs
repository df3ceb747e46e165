//! Progress aggregation
//!
//! Extractors report raw [`TransferSample`]s to a [`ProgressSink`]. The
//! [`ProgressAggregator`] folds each sample into the job record with one
//! registry update, using [`next_percentage`] so the stored value only climbs
//! through three bands: up to 90 while bytes flow, 95 once the transfer is
//! finished, and 100 only when the worker commits the artifact.

use crate::registry::JobRegistry;
use crate::types::{Event, JobId, JobRecord, JobState};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Ceiling while bytes are still being transferred
pub const TRANSFER_CEILING: u8 = 90;

/// Value once the transfer reports it has finished
pub const FINISHED_PERCENT: u8 = 95;

/// One raw callback from the extractor
#[derive(Clone, Debug, PartialEq)]
pub enum TransferSample {
    /// Bytes are flowing
    Transferring {
        /// Bytes received so far
        transferred: u64,
        /// Total size, exact or estimated, if known
        total: Option<u64>,
        /// Bytes per second, if known
        rate: Option<f64>,
    },
    /// The extractor finished writing a stream
    Finished,
}

/// Receiver of transfer callbacks, keyed by job
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Fold one sample into the job's record
    async fn report(&self, id: &JobId, sample: TransferSample);
}

/// New percentage for `sample` given the `stored` one; never lower than `stored`
pub fn next_percentage(sample: &TransferSample, stored: u8) -> u8 {
    let candidate = match sample {
        TransferSample::Transferring {
            transferred,
            total: Some(total),
            ..
        } if *total > 0 => {
            let pct = transferred.saturating_mul(100) / total;
            pct.min(u64::from(TRANSFER_CEILING)) as u8
        }
        TransferSample::Transferring { .. } => stored,
        TransferSample::Finished => FINISHED_PERCENT,
    };
    candidate.max(stored)
}

/// Short status line for a known, non-zero rate
pub fn rate_message(rate: Option<f64>) -> Option<String> {
    match rate {
        Some(bps) if bps.is_finite() && bps > 0.0 => Some(format!("Speed: {} B/s", bps as u64)),
        _ => None,
    }
}

/// What a sample changed in a record
#[derive(Clone, Debug, PartialEq)]
pub enum SampleOutcome {
    /// Record is not in a phase that accepts this sample
    Ignored,
    /// Percentage or message updated while downloading
    Progressed {
        /// Stored percentage after the update
        percent: u8,
        /// Reported rate
        rate: Option<f64>,
    },
    /// Transfer finished; record moved to `processing`
    EnteredProcessing,
}

/// Apply `sample` to `record`
///
/// Samples only count while the record is `downloading`. The first
/// `Finished` moves it to `processing`, after which later samples (the
/// extractor may finish several streams of one item) are ignored.
pub fn apply_sample(record: &mut JobRecord, sample: &TransferSample) -> SampleOutcome {
    if record.state != JobState::Downloading {
        return SampleOutcome::Ignored;
    }

    match sample {
        TransferSample::Transferring { total, rate, .. } => {
            let percent = next_percentage(sample, record.progress);
            record.raise_progress(percent);
            if let Some(total) = total.filter(|t| *t > 0) {
                record.size_bytes = Some(total);
            }
            if let Some(message) = rate_message(*rate) {
                record.message = message;
            }
            record.current_step = "Downloading video".to_string();
            SampleOutcome::Progressed {
                percent: record.progress,
                rate: *rate,
            }
        }
        TransferSample::Finished => {
            if record.transition_to(JobState::Processing).is_err() {
                return SampleOutcome::Ignored;
            }
            record.raise_progress(next_percentage(sample, record.progress));
            record.current_step = "Processing video".to_string();
            record.message = "Download complete, finalizing...".to_string();
            SampleOutcome::EnteredProcessing
        }
    }
}

/// [`ProgressSink`] that writes into the shared registry and broadcasts events
#[derive(Clone)]
pub struct ProgressAggregator {
    registry: Arc<JobRegistry>,
    event_tx: broadcast::Sender<Event>,
}

impl ProgressAggregator {
    /// Create an aggregator over `registry`
    pub fn new(registry: Arc<JobRegistry>, event_tx: broadcast::Sender<Event>) -> Self {
        Self { registry, event_tx }
    }
}

#[async_trait]
impl ProgressSink for ProgressAggregator {
    async fn report(&self, id: &JobId, sample: TransferSample) {
        let outcome = match self.registry.update(id, |r| apply_sample(r, &sample)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(job_id = %id, error = %e, "Dropping progress for unknown job");
                return;
            }
        };

        // send() only fails when nobody is subscribed
        let event = match outcome {
            SampleOutcome::Ignored => return,
            SampleOutcome::Progressed { percent, rate } => Event::Progress {
                id: id.clone(),
                percent,
                speed_bps: rate,
            },
            SampleOutcome::EnteredProcessing => Event::StateChanged {
                id: id.clone(),
                state: JobState::Processing,
            },
        };
        self.event_tx.send(event).ok();
    }
}

/// Sink for a single transfer attempt
///
/// Forwards byte samples and drops [`TransferSample::Finished`]. The worker
/// reports `Finished` once an attempt has returned successfully.
pub(crate) struct AttemptSink<'a> {
    inner: &'a dyn ProgressSink,
}

impl<'a> AttemptSink<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressSink) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ProgressSink for AttemptSink<'_> {
    async fn report(&self, id: &JobId, sample: TransferSample) {
        if sample == TransferSample::Finished {
            tracing::trace!(job_id = %id, "Holding finished signal until the attempt returns");
            return;
        }
        self.inner.report(id, sample).await;
    }
}
