//! HTTP server setup and routing
//!
//! Sets up the Axum router for the station endpoints and runs it until the
//! shutdown token fires.

use crate::error::{Error, Result};
use crate::services::ConversionWorker;
use crate::state::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted track upload
pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub converter: ConversionWorker,
    /// Destination folder for uploaded tracks
    pub files_dir: PathBuf,
}

/// Build the router with all station routes
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/api/radio", get(super::handlers::stream_radio))
        .route("/api/radio/skip", post(super::handlers::skip_track))
        .route(
            "/api/radio/queue",
            get(super::handlers::get_queue)
                .post(super::handlers::upload_track)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/radio/youtube", post(super::handlers::submit_remote_media))
        .route("/api/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until `shutdown` is cancelled
pub async fn run(addr: &str, ctx: AppContext, shutdown: CancellationToken) -> Result<()> {
    let state = Arc::clone(&ctx.state);
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            // Live streams never finish on their own
            state.broadcaster.close_all();
        })
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
