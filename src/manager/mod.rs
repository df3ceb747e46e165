//! Job lifecycle manager split into focused submodules.
//!
//! The `JobManager` struct and its methods are organized by concern:
//! - [`submit`] - Metadata lookups and job submission
//! - [`control`] - Polling, cancellation, artifact access and sweeping
//! - [`worker`] - Per-job task driving a record through its states
//! - [`finalization`] - Moving the transferred file and committing completion
//! - [`lifecycle`] - API server spawning and shutdown

mod control;
mod finalization;
mod lifecycle;
mod submit;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use control::Artifact;

use crate::config::Config;
use crate::error::Result;
use crate::expiry::{self, ExpiryHandle};
use crate::extractor::{Extractor, select_extractor};
use crate::progress::ProgressAggregator;
use crate::registry::JobRegistry;
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Admission and shutdown state
#[derive(Clone)]
pub(crate) struct LifecycleState {
    /// Cleared on shutdown; submissions are refused afterwards
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled on shutdown; stops the expiry scheduler
    pub(crate) shutdown: CancellationToken,
    /// Expiry scheduler task, awaited once on shutdown
    pub(crate) expiry_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Job workers, including those whose job was already cancelled
    pub(crate) workers: TaskTracker,
}

/// Job manager instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct JobManager {
    /// Live job records (the only shared mutable structure)
    pub(crate) registry: Arc<JobRegistry>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Metadata lookups and transfers
    pub(crate) extractor: Arc<dyn Extractor>,
    /// Deferred reclamation of terminal jobs
    pub(crate) expiry: ExpiryHandle,
    /// Admission and shutdown state
    pub(crate) lifecycle: LifecycleState,
}

impl JobManager {
    /// Create a manager using the extractor selected from `config.extractor`
    ///
    /// Creates the download and temp directories if needed and starts the
    /// expiry scheduler, so this must run inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directories cannot be created.
    pub async fn new(config: Config) -> Result<Self> {
        let extractor = select_extractor(&config.extractor);
        Self::with_extractor(config, extractor).await
    }

    /// Create a manager around a caller-provided extractor
    ///
    /// # Errors
    ///
    /// Returns an error if the working directories cannot be created.
    pub async fn with_extractor(config: Config, extractor: Arc<dyn Extractor>) -> Result<Self> {
        tokio::fs::create_dir_all(config.download_dir()).await?;
        tokio::fs::create_dir_all(config.temp_dir()).await?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let registry = Arc::new(JobRegistry::new());
        let shutdown = CancellationToken::new();
        let (expiry, expiry_task) = expiry::spawn(registry.clone(), event_tx.clone(), shutdown.clone());

        tracing::info!(
            download_dir = ?config.download_dir(),
            temp_dir = ?config.temp_dir(),
            extractor = extractor.name(),
            ttl_secs = config.expiry.ttl.as_secs(),
            "Job manager initialized"
        );

        Ok(Self {
            registry,
            event_tx,
            config: Arc::new(config),
            extractor,
            expiry,
            lifecycle: LifecycleState {
                accepting_new: Arc::new(AtomicBool::new(true)),
                shutdown,
                expiry_task: Arc::new(Mutex::new(Some(expiry_task))),
                workers: TaskTracker::new(),
            },
        })
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, JobManager};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let manager = JobManager::new(Config::default()).await?;
    ///
    ///     let mut events = manager.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "job event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Name of the active extractor
    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Sink that folds transfer samples into the registry
    pub(crate) fn progress_sink(&self) -> ProgressAggregator {
        ProgressAggregator::new(self.registry.clone(), self.event_tx.clone())
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
