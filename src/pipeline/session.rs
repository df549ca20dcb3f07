use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Set of identifiers already claimed for processing this session.
///
/// This is the concurrency-control primitive of the whole pipeline:
/// overlapping scan invocations stay safe because a claim is atomic with
/// its check, so whichever invocation claims an id first owns it and every
/// other invocation treats that post as a no-op.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: Mutex<HashSet<String>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check-and-claim. `true` means the caller now owns `id`.
    ///
    /// Claims happen *before* any fetch for the id starts, so a transient
    /// failure afterwards permanently excludes the id from retry this
    /// session (no duplicate requests over eventual completeness).
    pub fn claim(&self, id: &str) -> bool {
        self.seen.lock().insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

/// Session-scoped mutable state, owned by the scheduler rather than
/// ambient globals so toggle-off can tear everything down cleanly.
#[derive(Debug)]
pub struct SessionState {
    /// Posts already sent (or being sent) to the classifier.
    pub posts: DedupLedger,
    /// Opened posts for which the threshold check already fired.
    pub recommendations: DedupLedger,
    active: AtomicBool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            posts: DedupLedger::new(),
            recommendations: DedupLedger::new(),
            active: AtomicBool::new(true),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether annotation output is currently wanted. Scan passes that were
    /// already awaiting a response when the engine was disabled re-check
    /// this before writing anything to the page.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Full reset on toggle, allowing a complete rescan from empty state.
    pub fn reset(&self) {
        self.posts.clear();
        self.recommendations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_once_per_id() {
        let ledger = DedupLedger::new();
        assert!(ledger.claim("t3_abc"));
        assert!(!ledger.claim("t3_abc"));
        assert!(ledger.claim("t3_def"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn reset_clears_both_ledgers() {
        let session = SessionState::new();
        session.posts.claim("t3_abc");
        session.recommendations.claim("t3_abc");

        session.reset();
        assert!(session.posts.is_empty());
        assert!(session.recommendations.is_empty());
        assert!(session.posts.claim("t3_abc"));
    }

    #[test]
    fn sessions_start_active() {
        let session = SessionState::new();
        assert!(session.is_active());

        session.set_active(false);
        assert!(!session.is_active());
        session.set_active(true);
        assert!(session.is_active());
    }
}
