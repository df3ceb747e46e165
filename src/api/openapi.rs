//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec is served at `/openapi.json`. Route aliases (`/get_info`,
/// `/start_download`, `/download_file/{id}`, `/cancel_download/{id}`) behave
/// like their primary routes and are not listed separately.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "Asynchronous media retrieval jobs: submit a URL, poll progress, fetch the artifact",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::get_info,
        crate::api::routes::start_download,
        crate::api::routes::get_progress,
        crate::api::routes::get_file,
        crate::api::routes::cancel_download,

        // System
        crate::api::routes::index,
        crate::api::routes::health_check,
        crate::api::routes::cleanup,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(
        schemas(
            // Core types
            crate::types::JobId,
            crate::types::JobState,
            crate::types::JobRecord,
            crate::types::FormatInfo,
            crate::types::MediaMetadata,
            crate::types::Event,
            crate::expiry::SweepReport,

            // Request/response types
            crate::api::routes::InfoRequest,
            crate::api::routes::InfoResponse,
            crate::api::routes::DownloadRequest,
            crate::api::routes::DownloadResponse,
            crate::api::routes::CancelResponse,
            crate::api::routes::ProgressNotFound,
            crate::api::routes::HealthResponse,

            // Error types
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "jobs", description = "Metadata lookups, job submission, polling and artifacts"),
        (name = "system", description = "Health, sweeping, events and documentation")
    )
)]
pub struct ApiDoc;
