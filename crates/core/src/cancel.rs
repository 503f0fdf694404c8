// crates/core/src/cancel.rs
//! Cooperative cancellation token.
//!
//! Requesting cancellation only sets a flag; nothing is preempted.
//! Interruptible collaborators call [`CancelToken::checkpoint`] between
//! sub-steps (one external command, one template step) and abort with
//! [`ToolError::Cancelled`] when the flag is set. Operations that never
//! check the token run to completion even after a cancel request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ToolError;

/// Shared settable-once cancellation flag. Cheap to clone, never reset.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; the flag is never cleared.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Yield point for interruptible work: `Err(ToolError::Cancelled)`
    /// once cancellation was requested, `Ok(())` otherwise.
    pub fn checkpoint(&self) -> Result<(), ToolError> {
        if self.is_cancelled() {
            Err(ToolError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear_and_passes_checkpoint() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.checkpoint().is_ok());
    }

    #[test]
    fn cancel_is_sticky_and_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        token.cancel(); // idempotent
        assert!(clone.is_cancelled());
        assert!(matches!(clone.checkpoint(), Err(ToolError::Cancelled)));
    }
}
