//! Shutdown coordination shared between the room registry and the runtime.
//!
//! Shutdown happens in two steps: first the server stops admitting new
//! participants, then, once every room has been drained, final cleanup may run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ShutdownState {
    /// Set once no new joins should be admitted
    draining: Arc<AtomicBool>,
    /// Set once every room has been released
    drained: Arc<AtomicBool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the server stopped admitting participants.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Returns true once all rooms have been released.
    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Acquire)
    }

    pub fn begin_drain(&self) {
        if !self.draining.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated - no new participants will be admitted");
        }
    }

    pub fn mark_drained(&self) {
        if !self.drained.swap(true, Ordering::AcqRel) {
            info!("✅ All rooms released - ready for final cleanup");
        }
    }
}
