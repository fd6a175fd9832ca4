//! Shared station state
//!
//! Owned components shared between the producer, the HTTP handlers and the
//! background collaborators. No module-level globals: everything hangs off
//! one `Arc<SharedState>`.

use crate::radio::{Broadcaster, SkipSignal, Track, TrackSchedule};
use onair_common::{EventBus, RadioEvent};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Capacity of the station event channel (SSE)
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Shared state accessible by all components
pub struct SharedState {
    /// What plays next
    pub schedule: TrackSchedule,

    /// Pending skip request
    pub skip: SkipSignal,

    /// Listener fan-out registry
    pub broadcaster: Arc<Broadcaster>,

    /// Station event bus for SSE clients
    pub events: EventBus,

    now_playing: RwLock<Option<Track>>,
}

impl SharedState {
    pub fn new(schedule: TrackSchedule, broadcaster: Broadcaster) -> Self {
        Self {
            schedule,
            skip: SkipSignal::new(),
            broadcaster: Arc::new(broadcaster),
            events: EventBus::new(EVENT_CHANNEL_CAPACITY),
            now_playing: RwLock::new(None),
        }
    }

    /// Track the producer is currently streaming
    pub async fn now_playing(&self) -> Option<Track> {
        self.now_playing.read().await.clone()
    }

    pub async fn set_now_playing(&self, track: Option<Track>) {
        *self.now_playing.write().await = track;
    }

    /// Emit a `QueueChanged` event with current schedule lengths
    pub fn notify_queue_changed(&self) {
        self.events.emit_lossy(RadioEvent::QueueChanged {
            priority_len: self.schedule.priority_len(),
            regular_len: self.schedule.regular_len(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// State with default capacities and a `J` jingle, for unit tests
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use crate::radio::broadcaster::DEFAULT_SUBSCRIBER_CAPACITY;
        use crate::radio::schedule::DEFAULT_PRIORITY_CAPACITY;

        Self::new(
            TrackSchedule::new(Track::new("J"), DEFAULT_PRIORITY_CAPACITY),
            Broadcaster::new(DEFAULT_SUBSCRIBER_CAPACITY),
        )
    }
}
