//! Recording latch shared between the controller and the snippet recorder
//!
//! While a snippet records, the recorder holds a [`RecordingGuard`]. The
//! controller refuses `stop`, `skip_by` and `reverse_by` while the latch is
//! held, and blocks the latch while it tears a session down so no recording
//! can start against an engine that is being released.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const FREE: u8 = 0;
const HELD: u8 = 1;
const BLOCKED: u8 = 2;

/// Shared three-state latch: free, held by a recording, blocked by teardown
#[derive(Clone, Debug, Default)]
pub struct RecordingLock {
    state: Arc<AtomicU8>,
}

impl RecordingLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the latch for a recording. `None` if held or blocked.
    pub fn try_acquire(&self) -> Option<RecordingGuard> {
        self.state
            .compare_exchange(FREE, HELD, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RecordingGuard {
                state: Arc::clone(&self.state),
            })
    }

    pub fn is_held(&self) -> bool {
        self.state.load(Ordering::Acquire) == HELD
    }

    /// Block new recordings. Fails if one is in progress.
    pub(crate) fn block(&self) -> Option<TeardownBlock> {
        self.state
            .compare_exchange(FREE, BLOCKED, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TeardownBlock {
                state: Arc::clone(&self.state),
            })
    }
}

/// Held by the recorder for the lifetime of one recording
#[derive(Debug)]
pub struct RecordingGuard {
    state: Arc<AtomicU8>,
}

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        self.state.store(FREE, Ordering::Release);
    }
}

/// Held by the controller while it tears a session down
#[derive(Debug)]
pub(crate) struct TeardownBlock {
    state: Arc<AtomicU8>,
}

impl Drop for TeardownBlock {
    fn drop(&mut self) {
        self.state.store(FREE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_holder() {
        let lock = RecordingLock::new();
        let guard = lock.try_acquire().unwrap();
        assert!(lock.is_held());
        assert!(lock.try_acquire().is_none());

        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn test_block_excludes_recording() {
        let lock = RecordingLock::new();
        let block = lock.block().unwrap();
        assert!(lock.try_acquire().is_none());
        drop(block);

        let _guard = lock.try_acquire().unwrap();
        assert!(lock.block().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let lock = RecordingLock::new();
        let other = lock.clone();
        let _guard = lock.try_acquire().unwrap();
        assert!(other.is_held());
    }
}
