//! Cooperative shutdown flag.
//!
//! A single cloneable handle polled by every loop in the pipeline.
//! Receivers observe it within one socket timeout (<= 1 s); processors on
//! their next iteration. Requesting shutdown is idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable shutdown handle shared by all pipeline threads.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Idempotent; subsequent calls are no-ops.
    #[inline]
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Returns `true` once shutdown has been requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
