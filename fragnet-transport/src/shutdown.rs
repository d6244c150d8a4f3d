//! Cooperative shutdown signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable process-wide shutdown flag.
///
/// The receiver consults it on its error-retry path. Nothing in this
/// layer interrupts a blocking `recv_from` already in flight; teardown
/// beyond that is the transport's business.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the process as shutting down.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
