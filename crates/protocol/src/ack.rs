//! Shared acknowledgment handle
//!
//! An [`Ack`] wraps one upstream acknowledgment action with a required
//! completion count N. Handles are cheap to clone; all clones share the
//! same counter. The upstream action runs exactly once, on the completion
//! that takes the counter to zero - intermediate completions are silent
//! decrements.
//!
//! One `Ack` typically covers every message of a single `send` call, or
//! every destination a message fans out to, so the original producer is
//! confirmed only when the whole covering set has resolved - in whatever
//! order the parts resolve.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A zero-argument acknowledgment action
///
/// Owned by whichever component last holds responsibility for confirming
/// processing. Always carried as `Option<AckFn>`; `None` acknowledges
/// nothing and never faults.
pub type AckFn = Box<dyn FnOnce() + Send + 'static>;

/// Shared countdown acknowledgment
///
/// Safe to complete concurrently from multiple tasks; completions past
/// zero are no-ops. Dropping every handle without completing leaves the
/// upstream action uninvoked.
#[derive(Clone)]
pub struct Ack {
    inner: Arc<AckInner>,
}

struct AckInner {
    remaining: AtomicUsize,
    suppressed: AtomicBool,
    action: Mutex<Option<AckFn>>,
}

impl Ack {
    /// Wrap `action` so it fires after `count` completions
    ///
    /// A `count` of zero fires immediately - there is nothing to confirm.
    pub fn shared(action: Option<AckFn>, count: usize) -> Self {
        let ack = Self {
            inner: Arc::new(AckInner {
                remaining: AtomicUsize::new(count),
                suppressed: AtomicBool::new(false),
                action: Mutex::new(action),
            }),
        };
        if count == 0 {
            ack.resolve();
        }
        ack
    }

    /// Record one confirmed completion
    ///
    /// The completion that takes the counter to zero invokes the upstream
    /// action. Calls after zero are no-ops.
    pub fn complete_one(&self) {
        if self.decrement() {
            self.resolve();
        }
    }

    /// Record one completion without ever confirming upstream
    ///
    /// Marks a constituent as handled but deliberately unconfirmed. Once
    /// any constituent is discharged, the upstream action is dropped
    /// uninvoked when the counter reaches zero, so the producer never
    /// marks the covered messages as consumed.
    pub fn discharge_one(&self) {
        self.inner.suppressed.store(true, Ordering::Release);
        if self.decrement() {
            self.resolve();
        }
    }

    /// Completions still required before the action fires
    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Decrement the counter, saturating at zero
    ///
    /// Returns true only for the call that reached zero.
    fn decrement(&self) -> bool {
        self.inner
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            == Ok(1)
    }

    fn resolve(&self) {
        let action = self.inner.action.lock().take();
        if !self.inner.suppressed.load(Ordering::Acquire) {
            if let Some(action) = action {
                action();
            }
        }
    }
}

impl std::fmt::Debug for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ack")
            .field("remaining", &self.remaining())
            .finish()
    }
}
