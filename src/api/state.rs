//! Application state for the API server

use crate::JobManager;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the job manager.
#[derive(Clone)]
pub struct AppState {
    /// The job manager serving every request
    pub manager: Arc<JobManager>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<JobManager>) -> Self {
        Self { manager }
    }
}
