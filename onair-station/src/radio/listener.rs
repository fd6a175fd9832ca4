//! Per-connection listener session
//!
//! A session subscribes on creation and unsubscribes when dropped. The HTTP
//! layer drops the body stream when the client goes away or a write fails,
//! so every exit path releases the buffer.

use crate::radio::broadcaster::{Broadcaster, Subscription};
use bytes::Bytes;
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// One connected listener
pub struct ListenerSession {
    broadcaster: Arc<Broadcaster>,
    subscription: Subscription,
}

impl ListenerSession {
    /// Subscribe a new listener
    pub fn open(broadcaster: Arc<Broadcaster>) -> Self {
        let subscription = broadcaster.subscribe();
        info!(
            "Listener {} connected ({} listening)",
            subscription.id(),
            broadcaster.subscriber_count()
        );
        Self {
            broadcaster,
            subscription,
        }
    }

    pub fn id(&self) -> Uuid {
        self.subscription.id()
    }

    /// Wait for the next chunk; `None` once the broadcaster dropped this listener
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        self.subscription.recv().await
    }

    /// Convert the session into a response body stream
    ///
    /// The stream ends when the broadcaster drops the subscription. Dropping
    /// the stream ends the session.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let mut session = self;
        async_stream::stream! {
            while let Some(chunk) = session.next_chunk().await {
                yield Ok(chunk);
            }
        }
    }
}

impl Drop for ListenerSession {
    fn drop(&mut self) {
        let id = self.subscription.id();
        self.broadcaster.unsubscribe(id);
        info!(
            "Listener {} disconnected ({} listening)",
            id,
            self.broadcaster.subscriber_count()
        );
    }
}
