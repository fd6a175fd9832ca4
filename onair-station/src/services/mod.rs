//! Collaborators around the broadcast engine
//!
//! - [`converter`]: remote media → local track, via a background worker
//! - [`storage_sync`]: remote storage → regular rotation, on an interval

pub mod converter;
pub mod storage_sync;

pub use converter::{ConversionWorker, HttpFfmpegConverter, MediaConverter};
pub use storage_sync::{DirectoryStore, StorageSync, TrackStore};
