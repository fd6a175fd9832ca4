//! On-Air Station (onair-station) - Main entry point
//!
//! Loads configuration, seeds the schedule, starts the stream producer and
//! background collaborators, then serves the HTTP API until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onair_station::api::{self, AppContext};
use onair_station::config::{ConfigOverrides, StationConfig};
use onair_station::radio::{Broadcaster, FileOpener, StreamProducer, Track, TrackSchedule};
use onair_station::services::{ConversionWorker, DirectoryStore, HttpFfmpegConverter, StorageSync};
use onair_station::SharedState;

/// Command-line arguments for onair-station
#[derive(Parser, Debug)]
#[command(name = "onair-station")]
#[command(about = "Live internet radio station")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "ONAIR_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = StationConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply(&cli.overrides);
    config.validate().context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting On-Air Station v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Files folder: {}", config.files_dir.display());

    let schedule = build_schedule(&config);
    info!(
        "Schedule ready: {} regular track(s), jingle {}",
        schedule.regular_len(),
        schedule.jingle()
    );

    let state = Arc::new(SharedState::new(
        schedule,
        Broadcaster::new(config.subscriber_capacity),
    ));
    let shutdown = CancellationToken::new();

    let producer = StreamProducer::new(
        Arc::clone(&state),
        Arc::new(FileOpener),
        config.producer_config(),
    )
    .spawn(shutdown.clone());

    let converter = Arc::new(HttpFfmpegConverter::new(
        config.converter.clone(),
        config.files_dir.clone(),
    ));
    let (conversions, _conversion_task) =
        ConversionWorker::spawn(Arc::clone(&state), converter, config.converter.job_capacity);

    if let Some(source_dir) = &config.storage_sync.source_dir {
        info!(
            "Storage sync enabled: {} every {}s",
            source_dir.display(),
            config.storage_sync.interval_secs
        );
        StorageSync::new(
            Arc::clone(&state),
            Arc::new(DirectoryStore::new(source_dir.clone())),
            config.files_dir.clone(),
        )
        .spawn(
            Duration::from_secs(config.storage_sync.interval_secs),
            shutdown.clone(),
        );
    }

    let ctx = AppContext {
        state: Arc::clone(&state),
        converter: conversions,
        files_dir: config.files_dir.clone(),
    };

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let served = api::run(&config.bind_addr(), ctx, shutdown.clone()).await;
    shutdown.cancel();

    if let Err(e) = producer.await {
        error!("Stream producer task failed: {}", e);
    }

    served.context("Server error")?;
    info!("Server shutdown complete");
    Ok(())
}

/// Seed the schedule from the playlist file and configured initial tracks
fn build_schedule(config: &StationConfig) -> TrackSchedule {
    let schedule = TrackSchedule::new(Track::new(config.jingle.clone()), config.priority_capacity);

    if let Some(playlist) = &config.playlist {
        if let Err(e) = schedule.load_regular(playlist) {
            warn!("Error loading playlist {}: {}", playlist.display(), e);
        }
    }

    for track in &config.initial_tracks {
        schedule.enqueue_regular(Track::new(track.clone()));
    }

    schedule
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
