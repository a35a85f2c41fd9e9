//! Cancellation contract, polled cooperatively by long-running phases.
//!
//! Registering the actual OS signal handler (SIGINT and friends) is the
//! CLI front-end's job; this crate only consumes the narrow poll contract
//! it hands down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An external "cancel requested" flag, polled between tasks.
pub trait CancellationSource: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// A source that never cancels, for callers with no cancellation collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancelled;

impl CancellationSource for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// An atomic-flag-backed cancellation source. Clones share the same flag,
/// so a handle can be kept by the caller while another is handed to the
/// engine.
#[derive(Debug, Default, Clone)]
pub struct AtomicCancellationSource {
    flag: Arc<AtomicBool>,
}

impl AtomicCancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl CancellationSource for AtomicCancellationSource {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_cancelled_is_always_false() {
        assert!(!NeverCancelled.is_cancelled());
    }

    #[test]
    fn atomic_source_reflects_cancel_call() {
        let source = AtomicCancellationSource::new();
        assert!(!source.is_cancelled());
        source.cancel();
        assert!(source.is_cancelled());
    }

    #[test]
    fn cloned_atomic_source_shares_flag() {
        let source = AtomicCancellationSource::new();
        let clone = source.clone();
        clone.cancel();
        assert!(source.is_cancelled());
    }
}
