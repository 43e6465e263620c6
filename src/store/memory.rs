//! In-process store, used by tests and by embedders that push routes
//! programmatically.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::store::{BackendRecord, RouteRecord, RouteStore, StoreError, StoreSnapshot};

/// A mutable store held in memory.
///
/// Every mutation bumps the revision. `set_available(false)` makes fetches
/// fail as if the store were unreachable.
#[derive(Debug)]
pub struct MemoryStore {
    snapshot: RwLock<StoreSnapshot>,
    available: AtomicBool,
    revision: AtomicU64,
    fetches: AtomicU64,
}

impl MemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            available: AtomicBool::new(true),
            revision: AtomicU64::new(1),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn from_records(backends: Vec<BackendRecord>, routes: Vec<RouteRecord>) -> Self {
        Self::new(StoreSnapshot { backends, routes })
    }

    /// Replace the whole contents.
    pub fn replace(&self, snapshot: StoreSnapshot) {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn push_route(&self, route: RouteRecord) {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        guard.routes.push(route);
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn push_backend(&self, backend: BackendRecord) {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        guard.backends.push(backend);
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful and failed `fetch` calls so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreSnapshot::default())
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn fetch(&self) -> Result<StoreSnapshot, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let guard = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    async fn revision(&self) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        Ok(Some(self.revision.load(Ordering::SeqCst).to_string()))
    }
}
