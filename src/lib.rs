//! # media-dl
//!
//! Asynchronous media retrieval jobs served over HTTP.
//!
//! A client submits a source URL and a format selector, polls the job until it
//! reaches a terminal state, then fetches the finished artifact. Jobs run as
//! background tasks; every fallible phase is retried, progress only moves
//! forward, and finished jobs expire after a configurable TTL.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, JobManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = JobManager::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = manager
//!         .submit("https://youtube.com/watch?v=abcdefghijk", Some("best"))
//!         .await?;
//!     let record = manager.progress(&id).await?;
//!     println!("{}: {}%", record.state, record.progress);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Deferred job expiry and sweeping
pub mod expiry;
/// Metadata lookup and media transfer backends
pub mod extractor;
/// Job manager (decomposed into focused submodules)
pub mod manager;
/// Progress aggregation
pub mod progress;
/// Concurrent job registry
pub mod registry;
/// Retry logic with randomized delays
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, RetryPolicy};
pub use error::{ApiError, Error, ErrorDetail, JobError, Result, ToHttpStatus};
pub use expiry::SweepReport;
pub use extractor::{ExtractionProfile, Extractor, TransferRequest};
pub use manager::{Artifact, JobManager};
pub use progress::{ProgressSink, TransferSample};
pub use types::{Event, FormatInfo, JobId, JobRecord, JobState, MediaMetadata};

/// Block until the process is asked to stop, then shut `manager` down
///
/// On Unix the stop request is SIGTERM or SIGINT; elsewhere it is Ctrl+C.
/// When no signal listener can be installed (some sandboxes refuse them)
/// this falls back to `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, JobManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = JobManager::new(Config::default()).await?;
///     let _api = manager.spawn_api_server();
///     run_with_shutdown(manager).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: JobManager) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    fn listen(kind: SignalKind, name: &'static str) -> Option<Signal> {
        signal(kind)
            .inspect_err(|e| tracing::warn!(signal = name, error = %e, "Cannot listen for signal"))
            .ok()
    }

    async fn delivered(listener: Option<Signal>) {
        match listener {
            Some(mut listener) => {
                listener.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    let terminate = listen(SignalKind::terminate(), "SIGTERM");
    let interrupt = listen(SignalKind::interrupt(), "SIGINT");

    if terminate.is_none() && interrupt.is_none() {
        wait_for_ctrl_c().await;
        return;
    }

    let name = tokio::select! {
        () = delivered(terminate) => "SIGTERM",
        () = delivered(interrupt) => "SIGINT",
    };
    tracing::info!(signal = name, "Stop requested");
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Ctrl+C listener failed, stopping now");
        return;
    }
    tracing::info!(signal = "ctrl-c", "Stop requested");
}
