//! HTTP request handlers
//!
//! Implements the station endpoints: live stream, skip, queue inspection,
//! track upload and remote media submission.

use crate::api::server::AppContext;
use crate::error::{Error, Result};
use crate::radio::{ListenerSession, Track};
use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use onair_common::RadioEvent;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    message: String,
    path: String,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    priority: Vec<Track>,
    regular: Vec<Track>,
    now_playing: Option<Track>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteMediaRequest {
    source: String,
    url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "onair-station".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Radio Endpoints
// ============================================================================

/// GET /api/radio - Live MP3 stream
///
/// The body never ends on its own; the listener is unsubscribed when the
/// client disconnects and the body stream is dropped.
pub async fn stream_radio(State(ctx): State<AppContext>) -> Response {
    let session = ListenerSession::open(ctx.state.broadcaster.clone());

    (
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(session.into_stream()),
    )
        .into_response()
}

/// POST /api/radio/skip - Cut the current track short
pub async fn skip_track(State(ctx): State<AppContext>) -> impl IntoResponse {
    let armed = ctx.state.skip.request();
    if armed {
        info!("Skip requested");
    } else {
        info!("Skip requested (already pending)");
    }

    ctx.state.events.emit_lossy(RadioEvent::SkipRequested {
        armed,
        timestamp: chrono::Utc::now(),
    });

    (StatusCode::OK, "Skip signal sent.")
}

/// GET /api/radio/queue - Current schedule contents
pub async fn get_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    let snapshot = ctx.state.schedule.snapshot();
    let now_playing = ctx.state.now_playing().await;

    Json(QueueResponse {
        priority: snapshot.priority,
        regular: snapshot.regular,
        now_playing,
    })
}

/// POST /api/radio/queue - Upload a track into the priority schedule
///
/// Waits for any running conversion first so converted tracks keep their
/// place ahead of uploads made while they were in flight.
pub async fn upload_track(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    ctx.converter.wait_idle().await;

    let (file_name, data) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| Error::BadRequest(format!("Error reading upload: {}", e)))?
            .ok_or_else(|| Error::BadRequest("Missing 'file' field".to_string()))?;

        if field.name() != Some("file") {
            continue;
        }

        let file_name = sanitize_file_name(field.file_name().unwrap_or_default())
            .ok_or_else(|| Error::BadRequest("Invalid file name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Error reading upload: {}", e)))?;
        break (file_name, data);
    };

    tokio::fs::create_dir_all(&ctx.files_dir).await?;
    let dest = ctx.files_dir.join(&file_name);
    if let Err(e) = tokio::fs::write(&dest, &data).await {
        error!("Error saving upload {}: {}", dest.display(), e);
        return Err(e.into());
    }
    info!("Saved upload {} ({} bytes)", dest.display(), data.len());

    let track = Track::from(dest.as_path());
    if let Err(e) = ctx.state.schedule.enqueue_priority(track.clone()) {
        warn!("Upload {} not queued: {}", track, e);
        return Err(e);
    }
    ctx.state.notify_queue_changed();

    Ok(Json(UploadResponse {
        message: "File uploaded and added to queue".to_string(),
        path: track.to_string(),
    }))
}

/// POST /api/radio/youtube - Convert remote media and queue the result
pub async fn submit_remote_media(
    State(ctx): State<AppContext>,
    Json(req): Json<RemoteMediaRequest>,
) -> Result<Json<MessageResponse>> {
    if req.source != "youtube" {
        return Err(Error::BadRequest(format!("Unsupported source: {}", req.source)));
    }
    if req.url.trim().is_empty() {
        return Err(Error::BadRequest("Missing url".to_string()));
    }

    info!("Conversion requested for {}", req.url);
    ctx.converter.submit(req.url)?;

    Ok(Json(MessageResponse {
        message: "Conversion job enqueued. The track will be added when ready.".to_string(),
    }))
}

/// Keep only the final path component of a client-supplied file name
fn sanitize_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
}
