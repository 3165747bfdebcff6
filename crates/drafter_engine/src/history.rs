use std::sync::{Arc, PoisonError, RwLock};

use drafter_core::{DraftHistory, DraftHistoryEntry};

/// Cloneable handle onto one session's draft history.
///
/// Runners and batch coordinators of the same session share a recorder, so
/// every successful draft lands in one list. Readers always get copies.
#[derive(Debug, Clone, Default)]
pub struct HistoryRecorder {
    inner: Arc<RwLock<DraftHistory>>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: DraftHistoryEntry) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record(entry);
    }

    pub fn list(&self) -> Vec<DraftHistoryEntry> {
        self.read(DraftHistory::list)
    }

    pub fn latest(&self) -> Option<DraftHistoryEntry> {
        self.read(|history| history.latest().cloned())
    }

    pub fn len(&self) -> usize {
        self.read(DraftHistory::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(DraftHistory::is_empty)
    }

    pub fn remove(&self, id: &str) -> Option<DraftHistoryEntry> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    fn read<T>(&self, f: impl FnOnce(&DraftHistory) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&*guard)
    }
}
