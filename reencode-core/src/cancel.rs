//! Shared interrupt flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once by an interrupt handler; read by workers and the encode loop.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Returns true only for the call that raised it.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
