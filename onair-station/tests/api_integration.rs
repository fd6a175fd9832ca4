//! Integration tests for the On-Air Station API
//!
//! Tests the API surface:
//! - Health checks
//! - Skip control
//! - Queue inspection and uploads
//! - Remote media submission
//! - Live stream fan-out

use async_trait::async_trait;
use axum::body::Body;
use axum::http::StatusCode;
use http::{header, Method, Request};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tower::ServiceExt;

use onair_common::RadioEvent;
use onair_station::api::{build_router, AppContext};
use onair_station::error::{Error, Result};
use onair_station::radio::{Broadcaster, Track, TrackSchedule};
use onair_station::services::{ConversionWorker, MediaConverter};
use onair_station::SharedState;

const BOUNDARY: &str = "onair-test-boundary";

/// Converter that always fails; uploads and submissions never depend on it
struct RejectingConverter;

#[async_trait]
impl MediaConverter for RejectingConverter {
    async fn convert(&self, reference: &str) -> Result<Track> {
        Err(Error::Conversion(format!("cannot convert {}", reference)))
    }
}

struct TestStation {
    router: axum::Router,
    state: Arc<SharedState>,
    files: tempfile::TempDir,
}

/// Test helper to create a station with a small priority capacity
fn setup_test_station(priority_capacity: usize) -> TestStation {
    let files = tempfile::tempdir().expect("Failed to create temp dir");
    let schedule = TrackSchedule::with_regular(
        Track::new("files/jingle.mp3"),
        priority_capacity,
        vec![Track::new("files/a.mp3"), Track::new("files/b.mp3")],
    );
    let state = Arc::new(SharedState::new(schedule, Broadcaster::new(8)));
    let (converter, _) =
        ConversionWorker::spawn(Arc::clone(&state), Arc::new(RejectingConverter), 10);

    let router = build_router(AppContext {
        state: Arc::clone(&state),
        converter,
        files_dir: files.path().to_path_buf(),
    });

    TestStation {
        router,
        state,
        files,
    }
}

/// Helper function to make JSON requests to the test router
async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(path);

    let request = if let Some(json_body) = body {
        request = request.header(header::CONTENT_TYPE, "application/json");
        request.body(Body::from(json_body.to_string())).unwrap()
    } else {
        request.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("Response is not JSON")
}

/// Build a multipart upload request carrying one `file` field
fn upload_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/mpeg\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/radio/queue")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, as_json(&bytes))
}

#[tokio::test]
async fn test_health_endpoint() {
    let station = setup_test_station(20);
    let (status, body) = make_request(&station.router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = as_json(&body);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "onair-station");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_skip_sets_signal_and_emits_event() {
    let station = setup_test_station(20);
    let mut events = station.state.events.subscribe();

    let (status, body) = make_request(&station.router, Method::POST, "/api/radio/skip", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Skip signal sent.");
    assert!(station.state.skip.is_pending());

    // Second request coalesces into the pending one
    let (status, _) = make_request(&station.router, Method::POST, "/api/radio/skip", None).await;
    assert_eq!(status, StatusCode::OK);

    assert!(matches!(
        events.recv().await.unwrap(),
        RadioEvent::SkipRequested { armed: true, .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        RadioEvent::SkipRequested { armed: false, .. }
    ));

    assert!(station.state.skip.take());
    assert!(!station.state.skip.take());
}

#[tokio::test]
async fn test_get_queue() {
    let station = setup_test_station(20);
    station.state.schedule.enqueue_priority(Track::new("files/up.mp3")).unwrap();

    let (status, body) = make_request(&station.router, Method::GET, "/api/radio/queue", None).await;
    assert_eq!(status, StatusCode::OK);

    let body = as_json(&body);
    assert_eq!(body["priority"], json!(["files/up.mp3"]));
    assert_eq!(body["regular"], json!(["files/a.mp3", "files/b.mp3"]));
    assert_eq!(body["now_playing"], Value::Null);
}

#[tokio::test]
async fn test_upload_saves_file_and_enqueues_priority() {
    let station = setup_test_station(20);

    let (status, body) = send(&station.router, upload_request("file", "new.mp3", b"ID3data")).await;
    assert_eq!(status, StatusCode::OK);

    let saved = station.files.path().join("new.mp3");
    assert_eq!(std::fs::read(&saved).unwrap(), b"ID3data");
    assert_eq!(body["path"], saved.to_string_lossy().as_ref());

    // Uploaded track plays before the regular rotation
    assert_eq!(
        station.state.schedule.next(),
        Some(Track::from(saved.as_path()))
    );
}

#[tokio::test]
async fn test_upload_strips_directories_from_file_name() {
    let station = setup_test_station(20);

    let (status, _) = send(
        &station.router,
        upload_request("file", "../../escape.mp3", b"x"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(station.files.path().join("escape.mp3").exists());
    assert!(!station.files.path().parent().unwrap().join("escape.mp3").exists());
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let station = setup_test_station(20);

    let (status, body) = send(&station.router, upload_request("other", "a.mp3", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["status"].as_str().unwrap().starts_with("error:"));
    assert_eq!(station.state.schedule.priority_len(), 0);
}

#[tokio::test]
async fn test_upload_to_full_queue_returns_conflict() {
    let station = setup_test_station(1);

    let (status, _) = send(&station.router, upload_request("file", "one.mp3", b"1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&station.router, upload_request("file", "two.mp3", b"2")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["status"].as_str().unwrap().contains("full"));

    // File is kept on disk, schedule is unchanged
    assert!(station.files.path().join("two.mp3").exists());
    assert_eq!(station.state.schedule.priority_len(), 1);
}

#[tokio::test]
async fn test_remote_media_rejects_unsupported_source() {
    let station = setup_test_station(20);

    let (status, body) = make_request(
        &station.router,
        Method::POST,
        "/api/radio/youtube",
        Some(json!({"source": "vimeo", "url": "abc"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(as_json(&body)["status"]
        .as_str()
        .unwrap()
        .contains("Unsupported source"));
}

#[tokio::test]
async fn test_remote_media_submission_is_accepted() {
    let station = setup_test_station(20);
    let mut events = station.state.events.subscribe();

    let (status, body) = make_request(
        &station.router,
        Method::POST,
        "/api/radio/youtube",
        Some(json!({"source": "youtube", "url": "dQw4w9WgXcQ"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(as_json(&body)["message"].is_string());

    // The rejecting converter drops the job without touching the schedule
    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.event_type(), "ConversionFailed");
    assert_eq!(station.state.schedule.priority_len(), 0);
}

#[tokio::test]
async fn test_stream_delivers_published_chunks() {
    let station = setup_test_station(20);

    let request = Request::builder()
        .uri("/api/radio")
        .body(Body::empty())
        .unwrap();
    let response = station.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    // Hop-by-hop headers are left to the transport
    assert!(response.headers().get(header::CONNECTION).is_none());
    assert_eq!(station.state.broadcaster.subscriber_count(), 1);

    station.state.broadcaster.publish(bytes::Bytes::from_static(b"chunk-1"));
    station.state.broadcaster.publish(bytes::Bytes::from_static(b"chunk-2"));

    let mut body = response.into_body();
    let mut received = Vec::new();
    while received.len() < 14 {
        let frame = timeout(Duration::from_secs(5), body.frame())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Ok(data) = frame.into_data() {
            received.extend_from_slice(&data);
        }
    }
    assert_eq!(received, b"chunk-1chunk-2");

    // Client going away releases the listener buffer
    drop(body);
    assert_eq!(station.state.broadcaster.subscriber_count(), 0);
}
