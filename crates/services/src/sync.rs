use std::sync::atomic::{AtomicUsize, Ordering};

use drill_core::model::ProfileBook;

/// Receives a signal after every successful local save.
///
/// Transport, authentication and retry policy belong to the implementor.
pub trait SyncHook: Send + Sync {
    fn state_changed(&self, book: &ProfileBook);
}

/// Does nothing; the default when no remote sync is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSync;

impl SyncHook for NoopSync {
    fn state_changed(&self, _book: &ProfileBook) {}
}

/// Counts signals. Useful in tests and for diagnostics.
#[derive(Debug, Default)]
pub struct CountingSync {
    signals: AtomicUsize,
}

impl CountingSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.signals.load(Ordering::SeqCst)
    }
}

impl SyncHook for CountingSync {
    fn state_changed(&self, _book: &ProfileBook) {
        self.signals.fetch_add(1, Ordering::SeqCst);
    }
}
