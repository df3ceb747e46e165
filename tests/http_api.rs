//! HTTP polling flow against the public router

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ScriptedExtractor, TEST_BYTES, TEST_URL, create_manager};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn post(uri: &str, body: Value) -> Request<Body> {
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

#[tokio::test]
async fn submit_poll_and_fetch_over_http() {
    let (manager, _dir) = create_manager(ScriptedExtractor::succeeding()).await;
    let manager = Arc::new(manager);
    let app = media_dl::api::create_router(manager.clone(), manager.get_config());

    let (status, body) = send(&app, post("/info", json!({ "url": TEST_URL }))).await;
    assert_eq!(status, StatusCode::OK);
    let info: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(info["duration_str"], "00:01:01");

    let (status, body) = send(
        &app,
        post("/download", json!({ "url": TEST_URL, "quality": "18" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let submitted: Value = serde_json::from_slice(&body).unwrap();
    let id = submitted["download_id"].as_str().unwrap().to_string();

    let record = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (status, body) = send(&app, get(&format!("/progress/{id}"))).await;
            assert_eq!(status, StatusCode::OK);
            let record: Value = serde_json::from_slice(&body).unwrap();
            if ["completed", "error", "cancelled"].contains(&record["status"].as_str().unwrap()) {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(record["status"], "completed");
    assert_eq!(record["progress"], 100);
    assert_eq!(record["format"], "18");
    assert!(!record["file_path"].as_str().unwrap().is_empty());

    let (status, body) = send(&app, get(&format!("/get_file/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, TEST_BYTES);

    // cancelling a finished job is acknowledged and changes nothing
    let (status, _) = send(&app, post(&format!("/cancel/{id}"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, get(&format!("/progress/{id}"))).await;
    let after: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(after["status"], "completed");
}

#[tokio::test]
async fn failed_job_reports_error_over_http() {
    let (manager, _dir) = create_manager(ScriptedExtractor::failing(3)).await;
    let manager = Arc::new(manager);
    let app = media_dl::api::create_router(manager.clone(), manager.get_config());

    let (_, body) = send(&app, post("/download", json!({ "url": TEST_URL }))).await;
    let id = serde_json::from_slice::<Value>(&body).unwrap()["download_id"]
        .as_str()
        .unwrap()
        .to_string();

    let record = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, body) = send(&app, get(&format!("/progress/{id}"))).await;
            let record: Value = serde_json::from_slice(&body).unwrap();
            if record["status"] == "error" {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(record["error"], "network hiccup #3");
    assert!(record.get("file_path").is_none());

    let (status, _) = send(&app, get(&format!("/get_file/{id}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
