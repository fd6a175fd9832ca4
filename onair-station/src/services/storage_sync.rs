//! Remote storage synchronization
//!
//! Periodically lists a remote track store, mirrors new `.mp3` objects into
//! the local files folder and appends them to the regular rotation.

use crate::error::{Error, Result};
use crate::radio::Track;
use crate::state::SharedState;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A remote collection of track objects
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    /// Keys of all objects currently in the store
    async fn list(&self) -> Result<Vec<String>>;

    /// Copy object `key` to `dest`
    async fn fetch(&self, key: &str, dest: &Path) -> Result<()>;
}

/// Store backed by a mounted or cached directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TrackStore for DirectoryStore {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            Error::StorageSync(format!("failed to list {}: {}", self.root.display(), e))
        })?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn fetch(&self, key: &str, dest: &Path) -> Result<()> {
        tokio::fs::copy(self.root.join(key), dest).await?;
        Ok(())
    }
}

/// Mirrors a [`TrackStore`] into the regular rotation
pub struct StorageSync {
    state: Arc<SharedState>,
    store: Arc<dyn TrackStore>,
    files_dir: PathBuf,
}

impl StorageSync {
    pub fn new(state: Arc<SharedState>, store: Arc<dyn TrackStore>, files_dir: PathBuf) -> Self {
        Self {
            state,
            store,
            files_dir,
        }
    }

    /// One refresh pass; returns the number of tracks added to the rotation
    pub async fn refresh_once(&self) -> Result<usize> {
        let keys = self.store.list().await?;
        tokio::fs::create_dir_all(&self.files_dir).await.map_err(|e| {
            Error::StorageSync(format!(
                "failed to create local files folder {}: {}",
                self.files_dir.display(),
                e
            ))
        })?;

        let mut added = 0;
        for key in keys.iter().filter(|k| is_mp3(k)) {
            let Some(file_name) = key.rsplit('/').next().filter(|n| !n.is_empty()) else {
                continue;
            };
            let local_path = self.files_dir.join(file_name);
            let track = Track::from(local_path.as_path());

            if self.state.schedule.contains_regular(&track) {
                continue;
            }

            if tokio::fs::try_exists(&local_path).await.unwrap_or(false) {
                debug!("Local file exists: {}. Enqueuing.", local_path.display());
            } else if let Err(e) = self.store.fetch(key, &local_path).await {
                warn!("Failed to download {}/{}: {}", self.store.describe(), key, e);
                continue;
            } else {
                info!("Downloaded {}/{} to {}", self.store.describe(), key, local_path.display());
            }

            self.state.schedule.enqueue_regular(track);
            added += 1;
        }

        if added > 0 {
            self.state.notify_queue_changed();
        }
        Ok(added)
    }

    /// Refresh every `interval` until `shutdown` is cancelled
    pub fn spawn(self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; sync starts one interval in
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.cancelled() => break,
                }

                match self.refresh_once().await {
                    Ok(added) => info!(
                        "Regular queue refreshed from {} ({} new tracks)",
                        self.store.describe(),
                        added
                    ),
                    Err(e) => error!("Error refreshing regular queue: {}", e),
                }
            }
        })
    }
}

fn is_mp3(key: &str) -> bool {
    key.to_lowercase().ends_with(".mp3")
}
