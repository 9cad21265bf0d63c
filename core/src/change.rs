//! Change tracking with monotonically increasing revisions.
//!
//! A [`ChangeCounter`] lives on the observed value and is bumped by every
//! setter. Each consumer keeps its own [`ChangeCursor`] and consumes the
//! change once, so any number of dependents can observe one source without
//! registering callbacks.

use std::sync::atomic::{AtomicU64, Ordering};

static REVISION: AtomicU64 = AtomicU64::new(1);

/// Next process-wide revision. Strictly greater than every revision handed
/// out before it.
pub fn next_revision() -> u64 {
    REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Revision stamp of a mutable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeCounter {
    revision: u64,
}

impl Default for ChangeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeCounter {
    pub fn new() -> Self {
        Self {
            revision: next_revision(),
        }
    }

    /// Mark the owning value as changed.
    pub fn bump(&mut self) {
        self.revision = next_revision();
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// A consumer's view of a [`ChangeCounter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCursor {
    seen: u64,
}

impl ChangeCursor {
    /// A cursor that has already observed `counter`.
    pub fn observing(counter: &ChangeCounter) -> Self {
        Self {
            seen: counter.revision(),
        }
    }

    /// Returns `true` once per change of `counter`.
    pub fn consume(&mut self, counter: &ChangeCounter) -> bool {
        self.consume_revision(counter.revision())
    }

    /// Same as [`consume`](Self::consume) for a raw revision.
    pub fn consume_revision(&mut self, revision: u64) -> bool {
        if revision != self.seen {
            self.seen = revision;
            true
        } else {
            false
        }
    }

    pub fn is_stale(&self, counter: &ChangeCounter) -> bool {
        counter.revision() != self.seen
    }
}
