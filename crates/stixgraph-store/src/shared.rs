use crate::memory::{MemoryStore, StoreStats};
use parking_lot::Mutex;
use std::sync::Arc;

/// A [`MemoryStore`] shared between importers running on different threads.
///
/// Every call to [`SharedStore::with`] holds the lock for its whole duration,
/// so an import (or a single get-or-create) is atomic with respect to the
/// other holders.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<MemoryStore>>,
}

impl SharedStore {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MemoryStore) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.lock().stats()
    }
}
