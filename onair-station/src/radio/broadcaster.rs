//! Chunk fan-out to live listeners
//!
//! Each subscriber owns a bounded queue. `publish()` try-sends into every
//! queue; a full queue loses that chunk for that subscriber only. The
//! producer is never slowed down by a slow listener.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};
use uuid::Uuid;

/// Default per-subscriber buffer capacity, in chunks
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

/// Outcome of one `publish()` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the chunk
    pub delivered: usize,
    /// Subscribers whose buffer was full
    pub dropped: usize,
    /// Subscribers removed because their receiver was gone
    pub pruned: usize,
}

/// Receiving side of one listener registration
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<Bytes>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next chunk; `None` once unsubscribed and drained
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take a chunk if one is already buffered
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

/// Registry of subscriber buffers
#[derive(Debug)]
pub struct Broadcaster {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<Bytes>>>,
    capacity: usize,
}

impl Broadcaster {
    /// Create a broadcaster whose subscribers buffer up to `capacity` chunks
    pub fn new(capacity: usize) -> Self {
        info!("Broadcaster initialized with subscriber capacity {}", capacity);
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<Bytes>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new listener buffer
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();

        let mut registry = self.registry();
        registry.insert(id, tx);
        debug!("Subscriber {} registered ({} total)", id, registry.len());

        Subscription { id, rx }
    }

    /// Remove a listener buffer; unknown ids are ignored
    pub fn unsubscribe(&self, id: Uuid) {
        let mut registry = self.registry();
        if registry.remove(&id).is_some() {
            debug!("Subscriber {} removed ({} remaining)", id, registry.len());
        }
    }

    /// Deliver a chunk to every subscriber without blocking
    pub fn publish(&self, chunk: Bytes) -> PublishReport {
        let mut report = PublishReport::default();
        let mut registry = self.registry();

        registry.retain(|id, tx| match tx.try_send(chunk.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                report.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber {} receiver gone, pruning", id);
                report.pruned += 1;
                false
            }
        });

        report
    }

    /// Drop every registration, ending all listener streams
    pub fn close_all(&self) {
        let mut registry = self.registry();
        if !registry.is_empty() {
            info!("Closing {} listener stream(s)", registry.len());
        }
        registry.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}
