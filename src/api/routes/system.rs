//! System handlers: index, health, sweeping, events, OpenAPI.

use super::HealthResponse;
use crate::api::AppState;
use crate::error::Error;
use crate::expiry::SweepReport;
use crate::types::Event;
use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// GET / - Service index
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service name, status and endpoint map")
    )
)]
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "service": "media-dl",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
        "endpoints": {
            "/info": "POST - Get media information",
            "/download": "POST - Start a download",
            "/progress/<id>": "GET - Get download progress",
            "/get_file/<id>": "GET - Download completed file",
            "/cancel/<id>": "POST - Cancel download",
            "/health": "GET - Health check",
            "/cleanup": "POST - Cleanup old downloads",
            "/events": "GET - Server-sent job events",
            "/openapi.json": "GET - OpenAPI specification"
        }
    }))
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
        active_downloads: state.manager.active_downloads().await,
    })
}

/// POST /cleanup - Evict terminal jobs older than the sweep threshold
#[utoipa::path(
    post,
    path = "/cleanup",
    tag = "system",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<SweepReport>, Error> {
    Ok(Json(state.manager.sweep_expired().await?))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /events - Server-sent events stream
#[utoipa::path(
    get,
    path = "/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.manager.subscribe();
    let stream = BroadcastStream::new(receiver);

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json_data) => Some(Ok(SseEvent::default()
                .event(event_name(&event))
                .data(json_data))),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize event to JSON");
                None
            }
        },
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE client lagged");
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{skipped}}}"#
            ))))
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

/// SSE event name; matches the `type` tag of the JSON payload
fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Queued { .. } => "queued",
        Event::StateChanged { .. } => "state_changed",
        Event::Progress { .. } => "progress",
        Event::Completed { .. } => "completed",
        Event::Failed { .. } => "failed",
        Event::Cancelled { .. } => "cancelled",
        Event::Expired { .. } => "expired",
        Event::Shutdown => "shutdown",
    }
}
