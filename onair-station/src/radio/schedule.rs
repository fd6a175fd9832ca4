//! Dual-priority track schedule
//!
//! Holds the bounded priority list and the circular regular list. Both lists
//! live behind one mutex so `next()` and the enqueue operations are
//! linearizable against each other.
//!
//! Regular ring advance: popping a non-jingle track inserts the jingle at the
//! new head and re-appends the popped track at the tail, so the ring grows by
//! one entry per non-jingle pop. Popping the jingle only re-appends it.

use crate::error::{Error, Result};
use crate::radio::track::Track;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Default maximum number of tracks in the priority schedule
pub const DEFAULT_PRIORITY_CAPACITY: usize = 20;

#[derive(Debug, Default)]
struct Lists {
    priority: VecDeque<Track>,
    regular: VecDeque<Track>,
}

/// Copy of both schedules at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSnapshot {
    pub priority: Vec<Track>,
    pub regular: Vec<Track>,
}

/// Track schedule shared between the producer and the enqueue endpoints
#[derive(Debug)]
pub struct TrackSchedule {
    lists: Mutex<Lists>,
    jingle: Track,
    priority_capacity: usize,
}

impl TrackSchedule {
    /// Create an empty schedule with the given jingle and priority capacity
    pub fn new(jingle: Track, priority_capacity: usize) -> Self {
        Self {
            lists: Mutex::new(Lists::default()),
            jingle,
            priority_capacity,
        }
    }

    /// Create a schedule whose regular ring is seeded with `tracks`
    pub fn with_regular<I>(jingle: Track, priority_capacity: usize, tracks: I) -> Self
    where
        I: IntoIterator<Item = Track>,
    {
        let schedule = Self::new(jingle, priority_capacity);
        schedule.lock().regular.extend(tracks);
        schedule
    }

    fn lock(&self) -> MutexGuard<'_, Lists> {
        // Every critical section leaves the lists consistent, so a poisoned
        // lock still guards valid data.
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The reserved jingle track
    pub fn jingle(&self) -> &Track {
        &self.jingle
    }

    /// Pick the next track to play
    ///
    /// Priority entries are exhausted first in FIFO order; otherwise the
    /// regular ring advances. Returns `None` when both lists are empty.
    pub fn next(&self) -> Option<Track> {
        let mut lists = self.lock();

        if let Some(track) = lists.priority.pop_front() {
            debug!("Next track from priority schedule: {}", track);
            return Some(track);
        }

        let track = lists.regular.pop_front()?;
        if track != self.jingle {
            lists.regular.push_front(self.jingle.clone());
        }
        lists.regular.push_back(track.clone());

        debug!(
            "Next track from regular schedule: {} (ring length {})",
            track,
            lists.regular.len()
        );
        Some(track)
    }

    /// Append a track to the priority schedule
    ///
    /// Fails with [`Error::QueueFull`] without touching the schedule when the
    /// priority list is already at capacity.
    pub fn enqueue_priority(&self, track: Track) -> Result<()> {
        let mut lists = self.lock();
        if lists.priority.len() >= self.priority_capacity {
            return Err(Error::QueueFull {
                capacity: self.priority_capacity,
            });
        }

        info!("Added priority track to queue: {}", track);
        lists.priority.push_back(track);
        Ok(())
    }

    /// Append a track to the tail of the regular ring
    pub fn enqueue_regular(&self, track: Track) {
        info!("Added regular track to queue: {}", track);
        self.lock().regular.push_back(track);
    }

    /// Replace the regular ring with the JSON array of track paths in `path`
    ///
    /// Returns the number of tracks loaded. The priority list is untouched.
    pub fn load_regular(&self, path: &Path) -> Result<usize> {
        let data = std::fs::read(path)?;
        let tracks: Vec<Track> = serde_json::from_slice(&data)?;
        let count = tracks.len();

        self.lock().regular = tracks.into();

        info!("Loaded {} tracks into regular queue from {}", count, path.display());
        Ok(count)
    }

    /// Whether `track` is currently anywhere in the regular ring
    pub fn contains_regular(&self, track: &Track) -> bool {
        self.lock().regular.contains(track)
    }

    pub fn priority_len(&self) -> usize {
        self.lock().priority.len()
    }

    pub fn regular_len(&self) -> usize {
        self.lock().regular.len()
    }

    /// Copy both lists atomically
    pub fn snapshot(&self) -> ScheduleSnapshot {
        let lists = self.lock();
        ScheduleSnapshot {
            priority: lists.priority.iter().cloned().collect(),
            regular: lists.regular.iter().cloned().collect(),
        }
    }
}
