//! Job handlers: lookups, submission, polling, artifacts, cancellation.

use super::{
    CancelResponse, DownloadRequest, DownloadResponse, InfoRequest, InfoResponse,
    ProgressNotFound, format_duration,
};
use crate::api::AppState;
use crate::error::{Error, JobError};
use crate::types::JobId;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// POST /info - Look up title and formats without creating a job
#[utoipa::path(
    post,
    path = "/info",
    tag = "jobs",
    request_body = InfoRequest,
    responses(
        (status = 200, description = "Media metadata", body = InfoResponse),
        (status = 400, description = "Missing body or URL", body = crate::error::ApiError),
        (status = 502, description = "Extractor failed after all attempts", body = crate::error::ApiError),
        (status = 503, description = "Extractor unavailable", body = crate::error::ApiError)
    )
)]
pub async fn get_info(
    State(state): State<AppState>,
    payload: Option<Json<InfoRequest>>,
) -> Result<Json<InfoResponse>, Error> {
    let Some(Json(request)) = payload else {
        return Err(Error::InvalidInput("No data provided".to_string()));
    };

    let metadata = state.manager.get_metadata(&request.url).await?;
    Ok(Json(InfoResponse {
        success: true,
        duration_str: format_duration(metadata.duration),
        metadata,
    }))
}

/// POST /download - Submit a job
#[utoipa::path(
    post,
    path = "/download",
    tag = "jobs",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Job created", body = DownloadResponse),
        (status = 400, description = "Missing body or URL", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    payload: Option<Json<DownloadRequest>>,
) -> Result<Json<DownloadResponse>, Error> {
    let Some(Json(request)) = payload else {
        return Err(Error::InvalidInput("No data provided".to_string()));
    };

    let format = request.quality.or(request.format_id);
    let id = state
        .manager
        .submit(&request.url, format.as_deref())
        .await?;

    Ok(Json(DownloadResponse {
        success: true,
        download_id: id,
        message: "Download started".to_string(),
    }))
}

/// GET /progress/:id - Poll a job
#[utoipa::path(
    get,
    path = "/progress/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job snapshot", body = crate::types::JobRecord),
        (status = 404, description = "Unknown or expired job", body = ProgressNotFound)
    )
)]
pub async fn get_progress(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.manager.progress(&JobId::from(id)).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(Error::Job(JobError::NotFound { .. })) => (
            StatusCode::NOT_FOUND,
            Json(ProgressNotFound {
                status: "not_found".to_string(),
                progress: 0,
                message: "Download not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /get_file/:id - Stream the finished artifact
#[utoipa::path(
    get,
    path = "/get_file/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown job or artifact gone", body = crate::error::ApiError),
        (status = 409, description = "Job not completed", body = crate::error::ApiError)
    )
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, Error> {
    let artifact = state.manager.open_artifact(&JobId::from(id)).await?;

    let content_type = match artifact.path.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    };
    let body = Body::from_stream(ReaderStream::new(artifact.file));

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, artifact.size_bytes.to_string()),
            (header::CONTENT_DISPOSITION, artifact.content_disposition),
        ],
        body,
    )
        .into_response())
}

/// POST /cancel/:id - Cancel a job
#[utoipa::path(
    post,
    path = "/cancel/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job cancelled", body = CancelResponse),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn cancel_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, Error> {
    state.manager.cancel(&JobId::from(id)).await?;
    Ok(Json(CancelResponse {
        success: true,
        message: "Download cancelled".to_string(),
    }))
}
