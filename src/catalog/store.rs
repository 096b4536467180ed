// src/catalog/store.rs
// =============================================================================
// The shared, in-memory catalog.
//
// One `Catalog` lives for the whole process and is handed to every crawl as
// an `Arc<Catalog>`. It is the only shared mutable state in the crawler:
//
// - the orchestrator removes an account's old records when a crawl starts
//   and flushes once all fetches are done
// - fetch tasks append records concurrently while the crawl runs
//
// Every mutation takes the internal lock for the duration of a single Vec
// operation, so each append is all-or-nothing and callers never need their
// own locking.
//
// Saves are serialized by a second, async lock: a flush waits for any save in
// progress, then snapshots the newest state and writes it. An older snapshot
// can never land on disk after a newer one.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::persist::{CatalogBackend, CatalogSnapshot, JsonFileBackend, MemoryBackend};
use super::record::ManifestRecord;
use crate::error::CatalogError;

// The catalog itself
//
// `state` is a plain std Mutex and is never held across an `.await`.
// The two async locks are held across awaits (a whole save, a whole crawl)
// and come from tokio.
pub struct Catalog {
    state: Mutex<CatalogSnapshot>,       // users + components
    backend: Arc<dyn CatalogBackend>,    // where flush() writes to
    save_lock: AsyncMutex<()>,           // one save at a time
    crawl_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,  // one per account
}

impl Catalog {
    pub fn new(snapshot: CatalogSnapshot, backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            state: Mutex::new(snapshot),
            backend,
            save_lock: AsyncMutex::new(()),
            crawl_locks: Mutex::new(HashMap::new()),
        }
    }

    /// An empty catalog whose flushes go nowhere but memory.
    pub fn in_memory() -> Self {
        Self::new(CatalogSnapshot::default(), Arc::new(MemoryBackend::new()))
    }

    /// Loads the catalog from a JSON file, which need not exist yet, and
    /// flushes back to the same file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let backend = JsonFileBackend::new(path.as_ref());
        let snapshot = backend.load().await?;
        tracing::debug!(
            path = %path.as_ref().display(),
            users = snapshot.users.len(),
            components = snapshot.components.len(),
            "Catalog loaded"
        );
        Ok(Self::new(snapshot, Arc::new(backend)))
    }

    fn state(&self) -> MutexGuard<'_, CatalogSnapshot> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds the account to the known-accounts set. Returns `false` if it was
    /// already known.
    pub fn register_account(&self, account: &str) -> bool {
        let mut state = self.state();
        if state.users.iter().any(|u| u == account) {
            return false;
        }
        state.users.push(account.to_string());
        true
    }

    /// Known accounts in the order they were first crawled.
    pub fn known_accounts(&self) -> Vec<String> {
        self.state().users.clone()
    }

    /// Drops every record whose `repo` key belongs to `account`. Returns how
    /// many were removed.
    pub fn remove_all_for(&self, account: &str) -> usize {
        let mut state = self.state();
        let before = state.components.len();
        // retain() keeps insertion order of the survivors
        state.components.retain(|record| !record.belongs_to(account));
        before - state.components.len()
    }

    pub fn append(&self, record: ManifestRecord) {
        self.state().components.push(record);
    }

    pub fn records(&self) -> Vec<ManifestRecord> {
        self.state().components.clone()
    }

    pub fn records_for(&self, account: &str) -> Vec<ManifestRecord> {
        self.state()
            .components
            .iter()
            .filter(|record| record.belongs_to(account))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state().components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persists the current contents through the backend.
    ///
    /// Concurrent flushes run one after another, and each one snapshots the
    /// state only after it owns the save lock.
    pub async fn flush(&self) -> Result<(), CatalogError> {
        let _saving = self.save_lock.lock().await;

        // Clone under the state lock, then release it before awaiting the
        // backend so appends from running fetch tasks are not blocked by I/O
        let snapshot = self.state().clone();
        self.backend.save(&snapshot).await
    }

    /// Serializes crawls of one account. The guard must be held for the
    /// whole crawl; crawls of other accounts are unaffected.
    pub async fn lock_account(&self, account: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .crawl_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // First crawl of an account creates its lock
            Arc::clone(locks.entry(account.to_string()).or_default())
        };
        // The std lock is released above; lock_owned() returns a guard that
        // keeps the Arc alive, so it can outlive this borrow of `self`
        lock.lock_owned().await
    }
}
