//! REST API server module
//!
//! Exposes the job manager over HTTP: metadata lookups, job submission,
//! progress polling, artifact download, cancellation and sweeping.

use crate::{Config, JobManager, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /info` (alias `/get_info`) - Look up metadata without creating a job
/// - `POST /download` (alias `/start_download`) - Submit a job
/// - `GET /progress/:id` - Poll a job
/// - `GET /get_file/:id` (alias `/download_file/:id`) - Stream the artifact
/// - `POST /cancel/:id` (alias `/cancel_download/:id`) - Cancel a job
///
/// ## System
/// - `GET /` - Service index
/// - `GET /health` - Health check
/// - `POST /cleanup` - Evict old terminal jobs
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(manager: Arc<JobManager>, config: Arc<Config>) -> Router {
    let state = AppState::new(manager);

    let router = Router::new()
        // Jobs
        .route("/info", post(routes::get_info))
        .route("/get_info", post(routes::get_info))
        .route("/download", post(routes::start_download))
        .route("/start_download", post(routes::start_download))
        .route("/progress/:id", get(routes::get_progress))
        .route("/get_file/:id", get(routes::get_file))
        .route("/download_file/:id", get(routes::get_file))
        .route("/cancel/:id", post(routes::cancel_download))
        .route("/cancel_download/:id", post(routes::cancel_download))
        // System
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route("/cleanup", post(routes::cleanup))
        .route("/events", get(routes::event_stream))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_request_body_bytes))
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed either way.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the manager shuts down, then stops accepting connections and
/// lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, JobManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = Arc::new(JobManager::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// media_dl::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<JobManager>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let shutdown = manager.lifecycle.shutdown.clone();
    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
