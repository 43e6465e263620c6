//! The currently published route table.
//!
//! # Design Decisions
//! - One `ArcSwap` holds the live table; readers never lock
//! - Publishing replaces the whole reference, so a reader sees either the
//!   old table or the new one, never a mix
//! - In-flight requests keep their `Arc` and finish on the table they
//!   started with

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

use crate::routing::table::RouteTable;

/// Shared handle to the published table.
#[derive(Debug, Clone)]
pub struct TableHandle {
    inner: Arc<ArcSwap<RouteTable>>,
}

impl TableHandle {
    pub fn new(table: RouteTable) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(table)),
        }
    }

    /// Cheap, non-blocking read of the current table.
    pub fn load(&self) -> Guard<Arc<RouteTable>> {
        self.inner.load()
    }

    /// Owned reference to the current table.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.inner.load_full()
    }

    /// Atomically make `table` the current table. Returns the previous one.
    pub fn publish(&self, table: RouteTable) -> Arc<RouteTable> {
        self.inner.swap(Arc::new(table))
    }
}
