//! Immutable route table snapshot.
//!
//! # Responsibilities
//! - Hold the path trie and the backend registry built from one store read
//! - Resolve request paths to routes
//!
//! # Design Decisions
//! - Never mutated after construction; a refresh builds a new table
//! - Routes hold their resolved backend directly, so dispatch does no
//!   registry lookups

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::routing::route::{Backend, Route};
use crate::routing::trie::{MatchKind, PathTrie};

/// A route found for a request path.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    pub route: &'a Arc<Route>,
    pub kind: MatchKind,
    /// Request segments consumed by the route's own path.
    pub depth: usize,
}

/// Point-in-time routing snapshot.
#[derive(Debug)]
pub struct RouteTable {
    trie: PathTrie<Arc<Route>>,
    backends: HashMap<String, Arc<Backend>>,
    skipped: usize,
    revision: Option<String>,
    built_at: SystemTime,
}

impl RouteTable {
    pub(crate) fn new(
        trie: PathTrie<Arc<Route>>,
        backends: HashMap<String, Arc<Backend>>,
        skipped: usize,
        revision: Option<String>,
        built_at: SystemTime,
    ) -> Self {
        Self {
            trie,
            backends,
            skipped,
            revision,
            built_at,
        }
    }

    /// A table with no routes; every lookup misses.
    pub fn empty() -> Self {
        Self::new(PathTrie::new(), HashMap::new(), 0, None, SystemTime::now())
    }

    /// Find the most specific route for `path`.
    pub fn lookup(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.trie.lookup(path).map(|m| RouteMatch {
            route: m.value,
            kind: m.kind,
            depth: m.depth,
        })
    }

    pub fn backend(&self, id: &str) -> Option<&Arc<Backend>> {
        self.backends.get(id)
    }

    /// Backend ids, sorted.
    pub fn backend_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn route_count(&self) -> usize {
        self.trie.len()
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// Records dropped while building this table.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Store revision this table was built from, if the store reports one.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::empty()
    }
}
