//! Coalesced skip signal
//!
//! Any number of `request()` calls before the producer polls collapse into a
//! single pending skip.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-pending-event flag shared by the skip endpoint and the producer
#[derive(Debug, Default)]
pub struct SkipSignal {
    pending: AtomicBool,
}

impl SkipSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a skip as pending
    ///
    /// Returns `true` if this call armed the flag, `false` if a skip was
    /// already pending.
    pub fn request(&self) -> bool {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Consume the pending skip, if any
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Check for a pending skip without consuming it
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
