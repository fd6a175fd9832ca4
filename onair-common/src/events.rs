//! Event types for the On-Air event system
//!
//! Station events are broadcast through an [`EventBus`] and serialized for
//! SSE transmission to control clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Station event types
///
/// Serialized with a `type` tag so SSE clients can dispatch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RadioEvent {
    /// The producer started streaming a track
    TrackStarted {
        /// Track reference (file path)
        track: String,
        /// Whether this track is the station jingle
        jingle: bool,
        /// When streaming started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track reached the end of its byte source
    TrackFinished {
        /// Track reference
        track: String,
        /// Bytes published for this track
        bytes_sent: u64,
        /// When the track finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was cut short by a skip request
    TrackSkipped {
        /// Track reference
        track: String,
        /// Bytes published before the skip took effect
        bytes_sent: u64,
        /// When the skip took effect
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track could not be opened or read and was abandoned
    TrackUnreadable {
        /// Track reference
        track: String,
        /// Failure description
        reason: String,
        /// When the failure was detected
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An operator requested a skip
    SkipRequested {
        /// False when a skip was already pending (request coalesced)
        armed: bool,
        /// When the request arrived
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Schedule contents changed (enqueue or storage sync)
    QueueChanged {
        /// Priority schedule length after the change
        priority_len: usize,
        /// Regular schedule length after the change
        regular_len: usize,
        /// When the schedule changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A remote media conversion produced a playable track
    ConversionFinished {
        /// Remote media reference that was converted
        reference: String,
        /// Resulting track reference
        track: String,
        /// When the conversion finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A remote media conversion failed (job dropped)
    ConversionFailed {
        /// Remote media reference
        reference: String,
        /// Failure description
        reason: String,
        /// When the conversion failed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RadioEvent {
    /// Get event type as string (used as the SSE event name)
    pub fn event_type(&self) -> &'static str {
        match self {
            RadioEvent::TrackStarted { .. } => "TrackStarted",
            RadioEvent::TrackFinished { .. } => "TrackFinished",
            RadioEvent::TrackSkipped { .. } => "TrackSkipped",
            RadioEvent::TrackUnreadable { .. } => "TrackUnreadable",
            RadioEvent::SkipRequested { .. } => "SkipRequested",
            RadioEvent::QueueChanged { .. } => "QueueChanged",
            RadioEvent::ConversionFinished { .. } => "ConversionFinished",
            RadioEvent::ConversionFailed { .. } => "ConversionFailed",
        }
    }
}

/// Broadcast bus for [`RadioEvent`]s
///
/// Subscribers only see events emitted after they subscribe. Slow
/// subscribers lag and lose the oldest events rather than blocking emitters.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RadioEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: RadioEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
