use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutex: one ingestion per journal at a time in this process.
///
/// Clones share the same lock table.
#[derive(Clone, Default)]
pub struct JournalLocks {
    inner: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl JournalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the journal's lock. Released when the guard drops.
    pub async fn acquire(&self, journal_id: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .entry(journal_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
