//! Cooperative turn cancellation.
//!
//! A turn checks its token at every suspension point — before each backend
//! call and before each tool dispatch. An in-flight call is allowed to
//! complete and its result is discarded, so cancellation never leaves a
//! partial irreversible side effect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Handle for cancelling a turn between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the turn's next suspension point.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
