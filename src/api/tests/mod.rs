use super::*;
use crate::manager::test_helpers::{MockExtractor, TEST_URL, create_test_manager};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

mod system;

/// Helper to create a test JobManager wrapped in Arc
async fn create_test_app(extractor: MockExtractor) -> (Arc<JobManager>, Router, TempDir) {
    let (manager, _extractor, temp_dir) = create_test_manager(extractor).await;
    let manager = Arc::new(manager);
    let app = create_router(manager.clone(), manager.get_config());
    (manager, app, temp_dir)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (manager, _extractor, _temp_dir) = create_test_manager(MockExtractor::new()).await;
    let manager = Arc::new(manager);

    // Port 0 = OS assigns a free port
    let mut config = (*manager.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let manager = manager.clone();
        let config = config.clone();
        async move { start_api_server(manager, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server did not stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (manager, _extractor, _temp_dir) = create_test_manager(MockExtractor::new()).await;

    let mut config = (*manager.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(Arc::new(manager), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (manager, _extractor, _temp_dir) = create_test_manager(MockExtractor::new()).await;

    let mut config = (*manager.get_config()).clone();
    config.api.cors_enabled = false;
    let app = create_router(Arc::new(manager), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let (manager, _extractor, _temp_dir) = create_test_manager(MockExtractor::new()).await;

    let mut config = (*manager.get_config()).clone();
    config.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(Arc::new(manager), Arc::new(config));

    let allowed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://allowed.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "http://allowed.example"
    );

    let denied = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://other.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(
        !denied
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
