//! Stream producer loop
//!
//! The single task that decides what plays. Each iteration pulls the next
//! track from the schedule, reads it in fixed-size chunks paced by a small
//! delay, and publishes every chunk to the broadcaster. A pending skip
//! aborts the current track; an unreadable track is logged and abandoned.
//!
//! Suspension points: idle backoff, track reads, pacing delay. Publishing
//! never suspends.

use crate::error::{Error, Result};
use crate::radio::track::Track;
use crate::state::SharedState;
use async_trait::async_trait;
use bytes::Bytes;
use onair_common::RadioEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Boxed byte source returned by a [`TrackOpener`]
pub type TrackReader = Box<dyn AsyncRead + Send + Unpin>;

/// Opens the byte source behind a track reference
#[async_trait]
pub trait TrackOpener: Send + Sync {
    /// Open `track` for reading
    ///
    /// Any failure is reported as [`Error::TrackUnreadable`].
    async fn open(&self, track: &Track) -> Result<TrackReader>;
}

/// Opens tracks as local files
#[derive(Debug, Default, Clone)]
pub struct FileOpener;

#[async_trait]
impl TrackOpener for FileOpener {
    async fn open(&self, track: &Track) -> Result<TrackReader> {
        let file = tokio::fs::File::open(track.path())
            .await
            .map_err(|source| Error::TrackUnreadable {
                track: track.to_string(),
                source,
            })?;
        Ok(Box::new(file))
    }
}

/// Pacing and polling parameters for the producer
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Bytes per published chunk
    pub chunk_size: usize,
    /// Delay after each published chunk (crude bitrate throttle)
    pub chunk_delay: Duration,
    /// Wait before polling an empty schedule again
    pub idle_backoff: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            chunk_delay: Duration::from_millis(20),
            idle_backoff: Duration::from_secs(1),
        }
    }
}

/// How one track's playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Reached end of the byte source
    Finished { bytes_sent: u64 },
    /// Cut short by a skip request
    Skipped { bytes_sent: u64 },
    /// Producer shutdown while the track was playing
    Shutdown,
}

/// The station's single producer
pub struct StreamProducer {
    state: Arc<SharedState>,
    opener: Arc<dyn TrackOpener>,
    config: ProducerConfig,
}

impl StreamProducer {
    pub fn new(state: Arc<SharedState>, opener: Arc<dyn TrackOpener>, config: ProducerConfig) -> Self {
        Self {
            state,
            opener,
            config,
        }
    }

    /// Run the producer loop in a background task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Produce until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Stream producer started (chunk_size={}, chunk_delay={:?}, idle_backoff={:?})",
            self.config.chunk_size, self.config.chunk_delay, self.config.idle_backoff
        );

        while !shutdown.is_cancelled() {
            let Some(track) = self.state.schedule.next() else {
                debug!("Schedule empty, idling for {:?}", self.config.idle_backoff);
                tokio::select! {
                    _ = tokio::time::sleep(self.config.idle_backoff) => continue,
                    _ = shutdown.cancelled() => break,
                }
            };

            self.state.set_now_playing(Some(track.clone())).await;
            let outcome = self.play_track(&track, &shutdown).await;
            self.state.set_now_playing(None).await;

            match outcome {
                Ok(TrackOutcome::Finished { bytes_sent }) => {
                    info!("Finished track {} ({} bytes)", track, bytes_sent);
                    self.state.events.emit_lossy(RadioEvent::TrackFinished {
                        track: track.to_string(),
                        bytes_sent,
                        timestamp: chrono::Utc::now(),
                    });
                }
                Ok(TrackOutcome::Skipped { bytes_sent }) => {
                    info!("Skipped track {} after {} bytes", track, bytes_sent);
                    self.state.events.emit_lossy(RadioEvent::TrackSkipped {
                        track: track.to_string(),
                        bytes_sent,
                        timestamp: chrono::Utc::now(),
                    });
                }
                Ok(TrackOutcome::Shutdown) => break,
                Err(e) => {
                    error!("Abandoning track: {}", e);
                    self.state.events.emit_lossy(RadioEvent::TrackUnreadable {
                        track: track.to_string(),
                        reason: e.to_string(),
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        }

        info!("Stream producer stopped");
    }

    /// Stream one track to the broadcaster
    pub async fn play_track(&self, track: &Track, shutdown: &CancellationToken) -> Result<TrackOutcome> {
        let mut reader = self.opener.open(track).await?;

        let jingle = track == self.state.schedule.jingle();
        info!("Now playing: {}{}", track, if jingle { " (jingle)" } else { "" });
        self.state.events.emit_lossy(RadioEvent::TrackStarted {
            track: track.to_string(),
            jingle,
            timestamp: chrono::Utc::now(),
        });

        let mut buf = vec![0u8; self.config.chunk_size];
        let mut bytes_sent = 0u64;

        loop {
            if self.state.skip.take() {
                return Ok(TrackOutcome::Skipped { bytes_sent });
            }

            let n = tokio::select! {
                read = read_chunk(&mut reader, &mut buf) => read.map_err(|source| Error::TrackUnreadable {
                    track: track.to_string(),
                    source,
                })?,
                _ = shutdown.cancelled() => return Ok(TrackOutcome::Shutdown),
            };

            if n == 0 {
                return Ok(TrackOutcome::Finished { bytes_sent });
            }

            if self.state.skip.take() {
                return Ok(TrackOutcome::Skipped { bytes_sent });
            }

            let report = self.state.broadcaster.publish(Bytes::copy_from_slice(&buf[..n]));
            if report.dropped > 0 {
                debug!("Chunk dropped for {} slow listener(s)", report.dropped);
            }
            bytes_sent += n as u64;

            if !self.config.chunk_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.chunk_delay) => {}
                    _ = shutdown.cancelled() => return Ok(TrackOutcome::Shutdown),
                }
            }
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of source
async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
