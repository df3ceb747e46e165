use super::*;
use crate::manager::test_helpers::wait_for_terminal;
use crate::types::{Event, JobId};

#[tokio::test]
async fn test_index_lists_endpoints() {
    let (_manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["service"], "media-dl");
    assert_eq!(json["status"], "running");
    let endpoints = json["endpoints"].as_object().unwrap();
    for key in ["/info", "/download", "/progress/<id>", "/get_file/<id>", "/cancel/<id>"] {
        assert!(endpoints.contains_key(key), "missing {key}");
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["active_downloads"], 0);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_counts_running_downloads() {
    let (extractor, gate) = MockExtractor::new().with_gate();
    let started = extractor.started();
    let (manager, app, _temp_dir) = create_test_app(extractor).await;

    let id = manager.submit(TEST_URL, None).await.unwrap();
    started.notified().await;

    let json = json_body(app.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(json["active_downloads"], 1);

    gate.notify_one();
    wait_for_terminal(&manager, &id).await;
}

#[tokio::test]
async fn test_cleanup_reports_counts() {
    let (manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;

    let id = manager.submit(TEST_URL, None).await.unwrap();
    wait_for_terminal(&manager, &id).await;

    // A fresh job is younger than the sweep threshold
    let response = app
        .oneshot(post_json("/cleanup", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(
        json,
        json!({ "success": true, "cleaned": 0, "remaining": 1 })
    );
}

#[tokio::test]
async fn test_cleanup_after_shutdown_is_unavailable() {
    let (manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;
    manager.shutdown().await.unwrap();

    let response = app
        .oneshot(post_json("/cleanup", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "shutting_down");
}

#[tokio::test]
async fn test_download_after_shutdown_is_unavailable() {
    let (manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;
    manager.shutdown().await.unwrap();

    let response = app
        .oneshot(post_json("/download", json!({ "url": TEST_URL })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_sse_event_stream() {
    let (manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;

    let request = Request::builder()
        .uri("/events")
        .header("Accept", "text/event-stream")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(
        content_type.contains("text/event-stream"),
        "Content-Type should be text/event-stream, got: {content_type}"
    );

    // The stream is fed by the same broadcast channel
    let mut receiver = manager.subscribe();
    manager.emit_event(Event::Expired {
        id: JobId::from("x"),
    });
    let received = tokio::time::timeout(Duration::from_millis(100), receiver.recv()).await;
    assert!(matches!(received, Ok(Ok(Event::Expired { .. }))));
}

#[tokio::test]
async fn test_openapi_spec_endpoint() {
    let (_manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;

    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["info"]["title"], "media-dl REST API");
    assert!(json["paths"]["/progress/{id}"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (_manager, app, _temp_dir) = create_test_app(MockExtractor::new()).await;

    let response = app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
