//! API server startup and shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::JobManager;

/// How long shutdown waits for running workers
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

impl JobManager {
    /// Spawn the REST API server in a background task
    ///
    /// The server binds to `config.api.bind_address` and stops once
    /// [`shutdown`](Self::shutdown) has run.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, JobManager};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let manager = JobManager::new(Config::default()).await?;
    ///     let api_handle = manager.spawn_api_server();
    ///     media_dl::run_with_shutdown(manager).await?;
    ///     api_handle.await??;
    ///     Ok(())
    /// }
    /// ```
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let manager = std::sync::Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }

    /// Gracefully shut down the manager
    ///
    /// Shutdown sequence:
    /// 1. Stop accepting new submissions
    /// 2. Wait up to 30 seconds for every worker task to exit
    /// 3. Stop the expiry scheduler
    /// 4. Emit [`Event::Shutdown`]
    ///
    /// Artifacts still on disk are left in place.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for cleanup that can fail.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.lifecycle.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Let workers finish, cancelled ones included
        let workers = &self.lifecycle.workers;
        workers.close();
        tracing::debug!(running = workers.len(), "Waiting for job workers");
        match tokio::time::timeout(SHUTDOWN_GRACE, workers.wait()).await {
            Ok(()) => tracing::info!("All job workers exited"),
            Err(_) => {
                tracing::warn!("Timeout waiting for job workers, proceeding with shutdown")
            }
        }

        // 3. Stop the expiry loop
        self.lifecycle.shutdown.cancel();
        let task = self.lifecycle.expiry_task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Expiry scheduler task failed");
            }
        }

        // 4. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        !self.lifecycle.accepting_new.load(Ordering::SeqCst)
    }
}
