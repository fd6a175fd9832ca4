//! Configuration management for onair-station
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (each with an `ONAIR_*` environment fallback)
//! 2. TOML configuration file (`--config`, `~/.config/onair/config.toml`,
//!    `/etc/onair/config.toml`)
//! 3. Built-in defaults (code constants)

use crate::error::{Error, Result};
use crate::radio::broadcaster::DEFAULT_SUBSCRIBER_CAPACITY;
use crate::radio::schedule::DEFAULT_PRIORITY_CAPACITY;
use crate::radio::ProducerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Application name used for config file discovery
pub const APP_NAME: &str = "onair";

/// Station configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// HTTP server port
    pub port: u16,

    /// HTTP bind address
    pub bind_host: String,

    /// Folder holding uploaded, converted and synced tracks
    pub files_dir: PathBuf,

    /// JSON array of track paths seeding the regular ring
    pub playlist: Option<PathBuf>,

    /// Tracks appended to the regular ring at startup
    pub initial_tracks: Vec<String>,

    /// Reserved jingle track
    pub jingle: String,

    /// Maximum priority schedule length
    pub priority_capacity: usize,

    /// Per-listener buffer capacity, in chunks
    pub subscriber_capacity: usize,

    /// Bytes per produced chunk
    pub chunk_size: usize,

    /// Delay after each chunk (bitrate throttle)
    pub chunk_delay_ms: u64,

    /// Idle poll interval when the schedule is empty
    pub idle_backoff_ms: u64,

    pub logging: LoggingConfig,
    pub converter: ConverterConfig,
    pub storage_sync: StorageSyncConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

/// Remote media conversion settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Download API returning `{"url", "expiresAt"}` for a media reference
    pub api_url: String,

    /// Bearer token for the download API
    pub api_key: Option<String>,

    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// Pending conversion jobs accepted before rejecting
    pub job_capacity: usize,
}

/// Remote storage synchronization settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSyncConfig {
    /// Remote storage mount to mirror (sync disabled when unset)
    pub source_dir: Option<PathBuf>,

    /// Seconds between refreshes
    pub interval_secs: u64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_host: "0.0.0.0".to_string(),
            files_dir: PathBuf::from("files"),
            playlist: None,
            initial_tracks: Vec::new(),
            jingle: "files/tingo_jingle.mp3".to_string(),
            priority_capacity: DEFAULT_PRIORITY_CAPACITY,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            chunk_size: 4096,
            chunk_delay_ms: 20,
            idle_backoff_ms: 1000,
            logging: LoggingConfig::default(),
            converter: ConverterConfig::default(),
            storage_sync: StorageSyncConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "onair_station=debug,tower_http=debug".to_string(),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            api_url: "https://zylalabs.com/api/6264/youtube+search+download+api/8850/download"
                .to_string(),
            api_key: None,
            ffmpeg_path: "ffmpeg".to_string(),
            job_capacity: 10,
        }
    }
}

impl Default for StorageSyncConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            interval_secs: 300,
        }
    }
}

/// Command-line overrides (flattened into the binary's argument parser)
#[derive(Debug, Default, Clone, clap::Args)]
pub struct ConfigOverrides {
    /// Port to listen on
    #[arg(short, long, env = "ONAIR_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "ONAIR_BIND_HOST")]
    pub bind_host: Option<String>,

    /// Folder for uploaded and synced tracks
    #[arg(long, env = "ONAIR_FILES_DIR")]
    pub files_dir: Option<PathBuf>,

    /// JSON playlist seeding the regular rotation
    #[arg(long, env = "ONAIR_PLAYLIST")]
    pub playlist: Option<PathBuf>,

    /// Jingle track path
    #[arg(long, env = "ONAIR_JINGLE")]
    pub jingle: Option<String>,

    /// Remote storage folder to sync into the rotation
    #[arg(long, env = "ONAIR_SYNC_DIR")]
    pub sync_dir: Option<PathBuf>,

    /// Download API key for remote conversions
    #[arg(long, env = "ONAIR_CONVERTER_API_KEY", hide_env_values = true)]
    pub converter_api_key: Option<String>,
}

impl StationConfig {
    /// Load from the discovered TOML file, or defaults when there is none
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match onair_common::config::find_config_file(explicit, APP_NAME) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Ok(onair_common::config::load_toml(&path)?)
            }
            None => {
                info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply command-line / environment overrides
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(host) = &overrides.bind_host {
            self.bind_host = host.clone();
        }
        if let Some(dir) = &overrides.files_dir {
            self.files_dir = dir.clone();
        }
        if let Some(playlist) = &overrides.playlist {
            self.playlist = Some(playlist.clone());
        }
        if let Some(jingle) = &overrides.jingle {
            self.jingle = jingle.clone();
        }
        if let Some(dir) = &overrides.sync_dir {
            self.storage_sync.source_dir = Some(dir.clone());
        }
        if let Some(key) = &overrides.converter_api_key {
            self.converter.api_key = Some(key.clone());
        }
    }

    /// Reject settings the station cannot run with
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("priority_capacity", self.priority_capacity),
            ("subscriber_capacity", self.subscriber_capacity),
            ("chunk_size", self.chunk_size),
            ("converter.job_capacity", self.converter.job_capacity),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }
        if self.storage_sync.source_dir.is_some() && self.storage_sync.interval_secs == 0 {
            return Err(Error::Config(
                "storage_sync.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.jingle.trim().is_empty() {
            return Err(Error::Config("jingle must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            chunk_size: self.chunk_size,
            chunk_delay: Duration::from_millis(self.chunk_delay_ms),
            idle_backoff: Duration::from_millis(self.idle_backoff_ms),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}
