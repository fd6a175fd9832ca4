//! Remote media conversion
//!
//! Turns a remote media reference into a local playable track. A single
//! background worker processes jobs one at a time from a bounded channel and
//! hands finished tracks to the priority schedule. Failures are logged and the
//! job is dropped; nothing is retried.

use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use crate::radio::Track;
use crate::state::SharedState;
use async_trait::async_trait;
use onair_common::RadioEvent;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Converts a remote media reference into a local track
#[async_trait]
pub trait MediaConverter: Send + Sync {
    async fn convert(&self, reference: &str) -> Result<Track>;
}

/// Response from the download API
#[derive(Debug, Deserialize)]
pub struct DownloadResponse {
    pub url: String,
    #[serde(rename = "expiresAt", default)]
    pub expires_at: String,
}

/// Downloads media through an HTTP API and transcodes it to MP3 with ffmpeg
pub struct HttpFfmpegConverter {
    client: reqwest::Client,
    config: ConverterConfig,
    files_dir: PathBuf,
}

impl HttpFfmpegConverter {
    pub fn new(config: ConverterConfig, files_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            files_dir,
        }
    }

    /// Ask the download API where the media can be fetched
    async fn resolve_download(&self, reference: &str) -> Result<DownloadResponse> {
        let mut request = self
            .client
            .get(&self.config.api_url)
            .query(&[("v", reference)]);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Conversion(format!("error calling download API: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Conversion(format!(
                "download API returned status: {}",
                response.status()
            )));
        }

        let download: DownloadResponse = response
            .json()
            .await
            .map_err(|e| Error::Conversion(format!("error decoding API response: {}", e)))?;

        info!(
            "Download API returned URL: {} (expires at {})",
            download.url, download.expires_at
        );
        Ok(download)
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Conversion(format!("error downloading media: {}", e)))?;

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Conversion(format!("error downloading media: {}", e)))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn download_and_transcode(&self, url: &str, input: &Path, output: &Path) -> Result<()> {
        self.download_to(url, input).await?;
        self.transcode(input, output).await
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let status = tokio::process::Command::new(&self.config.ffmpeg_path)
            .args(ffmpeg_args(input, output))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::Conversion(format!("failed to run {}: {}", self.config.ffmpeg_path, e)))?;

        if !status.success() {
            return Err(Error::Conversion(format!("ffmpeg exited with {}", status)));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaConverter for HttpFfmpegConverter {
    async fn convert(&self, reference: &str) -> Result<Track> {
        tokio::fs::create_dir_all(&self.files_dir).await?;

        let (input, output) = media_paths(&self.files_dir);
        let download = self.resolve_download(reference).await?;

        let result = self.download_and_transcode(&download.url, &input, &output).await;
        discard_intermediate(&input).await;
        result?;

        info!("Conversion successful: {}", output.display());
        Ok(Track::from(output.as_path()))
    }
}

/// Unique intermediate and output paths for one conversion
fn media_paths(files_dir: &Path) -> (PathBuf, PathBuf) {
    let id = Uuid::new_v4();
    (
        files_dir.join(format!("remote_media_{}.webm", id)),
        files_dir.join(format!("remote_media_{}.mp3", id)),
    )
}

/// Remove a downloaded intermediate file; a missing file is fine
async fn discard_intermediate(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove intermediate file {}: {}", path.display(), e),
    }
}

/// ffmpeg arguments: drop video, 44.1 kHz stereo, 192k MP3
fn ffmpeg_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Handle for submitting conversion jobs to the background worker
#[derive(Clone)]
pub struct ConversionWorker {
    jobs: mpsc::Sender<String>,
    in_progress: Arc<Mutex<()>>,
}

impl ConversionWorker {
    /// Start the worker task
    pub fn spawn(
        state: Arc<SharedState>,
        converter: Arc<dyn MediaConverter>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (jobs, mut rx) = mpsc::channel::<String>(capacity);
        let in_progress = Arc::new(Mutex::new(()));
        let lock = Arc::clone(&in_progress);

        let handle = tokio::spawn(async move {
            while let Some(reference) = rx.recv().await {
                let _guard = lock.lock().await;
                info!("Processing conversion job: {}", reference);
                process_job(&state, converter.as_ref(), &reference).await;
            }
            info!("Conversion worker stopped");
        });

        (Self { jobs, in_progress }, handle)
    }

    /// Queue a conversion job without waiting
    pub fn submit(&self, reference: impl Into<String>) -> Result<()> {
        let reference = reference.into();
        self.jobs.try_send(reference).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::ConversionBusy,
            mpsc::error::TrySendError::Closed(_) => {
                Error::Conversion("conversion worker is not running".to_string())
            }
        })
    }

    /// Wait until no conversion is running
    pub async fn wait_idle(&self) {
        let _guard = self.in_progress.lock().await;
    }
}

async fn process_job(state: &SharedState, converter: &dyn MediaConverter, reference: &str) {
    match converter.convert(reference).await {
        Ok(track) => {
            state.events.emit_lossy(RadioEvent::ConversionFinished {
                reference: reference.to_string(),
                track: track.to_string(),
                timestamp: chrono::Utc::now(),
            });
            match state.schedule.enqueue_priority(track.clone()) {
                Ok(()) => {
                    info!("Conversion finished, added file to queue: {}", track);
                    state.notify_queue_changed();
                }
                Err(e) => warn!("Converted track {} not queued: {}", track, e),
            }
        }
        Err(e) => {
            error!("Error converting remote media {}: {}", reference, e);
            state.events.emit_lossy(RadioEvent::ConversionFailed {
                reference: reference.to_string(),
                reason: e.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    /// Converter that waits for permission before finishing
    struct GatedConverter {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl MediaConverter for GatedConverter {
        async fn convert(&self, reference: &str) -> Result<Track> {
            self.gate.notified().await;
            if reference == "bad" {
                return Err(Error::Conversion("unsupported media".to_string()));
            }
            Ok(Track::new(format!("files/{}.mp3", reference)))
        }
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = ffmpeg_args(Path::new("in.webm"), Path::new("out.mp3"));
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp3"));
        assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "192k"));
    }

    #[test]
    fn test_media_paths_are_unique() {
        let dir = Path::new("files");
        let (input_a, output_a) = media_paths(dir);
        let (input_b, output_b) = media_paths(dir);

        assert_ne!(output_a, output_b);
        assert_ne!(input_a, input_b);
        assert_eq!(input_a.with_extension("mp3"), output_a);
        assert!(output_a.starts_with(dir));
    }

    /// Local stand-in for the download API serving a small media file
    async fn serve_download_api() -> String {
        use axum::{routing::get, Json, Router};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let media_url = format!("http://{}/media", addr);

        let app = Router::new()
            .route(
                "/download",
                get(move || {
                    let url = media_url.clone();
                    async move { Json(serde_json::json!({ "url": url, "expiresAt": "later" })) }
                }),
            )
            .route("/media", get(|| async { vec![0u8; 1024] }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/download", addr)
    }

    #[tokio::test]
    async fn test_failed_transcode_removes_intermediate_file() {
        let files = tempfile::tempdir().unwrap();
        let config = ConverterConfig {
            api_url: serve_download_api().await,
            api_key: None,
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            job_capacity: 1,
        };
        let converter = HttpFfmpegConverter::new(config, files.path().to_path_buf());

        let result = converter.convert("abc").await;
        assert!(matches!(result, Err(Error::Conversion(msg)) if msg.contains("/nonexistent/ffmpeg")));

        let leftovers: Vec<_> = std::fs::read_dir(files.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_discard_missing_intermediate_is_silent() {
        let files = tempfile::tempdir().unwrap();
        discard_intermediate(&files.path().join("never_downloaded.webm")).await;
    }

    #[test]
    fn test_download_response_parsing() {
        let response: DownloadResponse =
            serde_json::from_str(r#"{"url": "https://cdn/x.webm", "expiresAt": "soon"}"#).unwrap();
        assert_eq!(response.url, "https://cdn/x.webm");
        assert_eq!(response.expires_at, "soon");
    }

    #[tokio::test]
    async fn test_successful_job_enqueues_priority_track() {
        let state = Arc::new(SharedState::for_tests());
        let gate = Arc::new(Notify::new());
        let converter = Arc::new(GatedConverter { gate: Arc::clone(&gate) });
        let mut events = state.events.subscribe();

        let (worker, _handle) = ConversionWorker::spawn(Arc::clone(&state), converter, 10);
        worker.submit("abc").unwrap();
        gate.notify_one();

        let event = timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
        assert_eq!(event.event_type(), "ConversionFinished");

        worker.wait_idle().await;
        assert_eq!(state.schedule.snapshot().priority, vec![Track::new("files/abc.mp3")]);
    }

    #[tokio::test]
    async fn test_failed_job_is_dropped() {
        let state = Arc::new(SharedState::for_tests());
        let gate = Arc::new(Notify::new());
        let converter = Arc::new(GatedConverter { gate: Arc::clone(&gate) });
        let mut events = state.events.subscribe();

        let (worker, _handle) = ConversionWorker::spawn(Arc::clone(&state), converter, 10);
        worker.submit("bad").unwrap();
        gate.notify_one();

        let event = timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
        assert_eq!(event.event_type(), "ConversionFailed");
        assert_eq!(state.schedule.priority_len(), 0);
    }

    #[tokio::test]
    async fn test_full_job_queue_is_rejected() {
        let state = Arc::new(SharedState::for_tests());
        let gate = Arc::new(Notify::new());
        let converter = Arc::new(GatedConverter { gate: Arc::clone(&gate) });

        let (worker, _handle) = ConversionWorker::spawn(Arc::clone(&state), converter, 1);

        // First job is taken by the worker (blocked on the gate), second fills
        // the channel, third is rejected.
        worker.submit("one").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        worker.submit("two").unwrap();
        assert!(matches!(worker.submit("three"), Err(Error::ConversionBusy)));
    }

    #[tokio::test]
    async fn test_wait_idle_blocks_during_conversion() {
        let state = Arc::new(SharedState::for_tests());
        let gate = Arc::new(Notify::new());
        let converter = Arc::new(GatedConverter { gate: Arc::clone(&gate) });

        let (worker, _handle) = ConversionWorker::spawn(Arc::clone(&state), converter, 10);
        worker.submit("slow").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(timeout(Duration::from_millis(50), worker.wait_idle()).await.is_err());

        gate.notify_one();
        timeout(Duration::from_secs(5), worker.wait_idle()).await.unwrap();
        assert_eq!(state.schedule.priority_len(), 1);
    }
}
