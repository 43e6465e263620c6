//! Route table construction from raw store records.
//!
//! # Responsibilities
//! - Parse backends into a registry
//! - Validate routes and resolve their backends once, at build time
//! - Insert routes into the trie
//! - Report every record that was skipped or overwritten
//!
//! # Design Decisions
//! - A bad record never fails the build; it is logged and skipped
//! - Duplicate `(path, match kind)` slots: the later record in store order
//!   replaces the earlier one
//! - Only a store failure aborts a build (see `load_table`)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::routing::route::{Action, Backend, Redirect, Route};
use crate::routing::table::RouteTable;
use crate::routing::trie::{normalize, MatchKind, PathTrie};
use crate::store::{BackendRecord, RouteRecord, RouteStore, StoreError, StoreSnapshot};

/// Why a single record was left out of a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("backend {id}: invalid url: {reason}")]
    InvalidBackendUrl { id: String, reason: String },

    #[error("backend {id}: unsupported scheme {scheme:?}")]
    UnsupportedScheme { id: String, scheme: String },

    #[error("incoming path {0:?} must start with '/'")]
    InvalidPath(String),

    #[error("unknown match kind {0:?}")]
    UnknownMatchKind(String),

    #[error("unknown action kind {0:?}")]
    UnknownActionKind(String),

    #[error("backend route has no backend id")]
    MissingBackendId,

    #[error("backend {0:?} does not exist")]
    UnknownBackend(String),

    #[error("redirect route has no target")]
    MissingRedirectTarget,
}

/// A record the builder dropped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Backend id or route path, whichever identifies the record.
    pub record: String,
    pub error: RecordError,
}

/// Outcome of one build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub routes: usize,
    pub backends: usize,
    pub disabled: usize,
    pub overwritten: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Accumulates validated records into a new table.
#[derive(Debug, Default)]
pub struct TableBuilder {
    backends: HashMap<String, Arc<Backend>>,
    trie: PathTrie<Arc<Route>>,
    report: BuildReport,
    revision: Option<String>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag the table with the store revision it was built from.
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    /// Add a backend to the registry, or record why it was skipped.
    pub fn add_backend(&mut self, record: &BackendRecord) {
        match Backend::parse(&record.id, &record.url) {
            Ok(backend) => {
                if self.backends.insert(record.id.clone(), Arc::new(backend)).is_some() {
                    tracing::warn!(backend = %record.id, "Duplicate backend id, keeping the later record");
                }
            }
            Err(error) => self.skip(record.id.clone(), error),
        }
    }

    /// Validate and insert a route, or record why it was skipped.
    ///
    /// Backends referenced by the route must have been added first.
    pub fn add_route(&mut self, record: &RouteRecord) {
        if record.disabled {
            self.report.disabled += 1;
            tracing::debug!(path = %record.incoming_path, "Skipping disabled route");
            return;
        }

        let route = match self.validate(record) {
            Ok(route) => route,
            Err(error) => {
                self.skip(record.incoming_path.clone(), error);
                return;
            }
        };

        let kind = route.match_kind;
        let path = route.incoming_path.clone();
        if let Some(previous) = self.trie.insert(&path, kind, Arc::new(route)) {
            self.report.overwritten += 1;
            tracing::warn!(
                path = %path,
                match_kind = %kind,
                replaced_action = previous.action.kind(),
                "Duplicate route, the later record wins"
            );
        }
    }

    fn validate(&self, record: &RouteRecord) -> Result<Route, RecordError> {
        if !record.incoming_path.starts_with('/') {
            return Err(RecordError::InvalidPath(record.incoming_path.clone()));
        }

        let match_kind: MatchKind = record
            .match_kind
            .parse()
            .map_err(|_| RecordError::UnknownMatchKind(record.match_kind.clone()))?;

        let action = match record.action_kind.as_str() {
            "backend" => {
                let id = record
                    .backend_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .ok_or(RecordError::MissingBackendId)?;
                let backend = self
                    .backends
                    .get(id)
                    .ok_or_else(|| RecordError::UnknownBackend(id.to_string()))?;
                Action::Backend(Arc::clone(backend))
            }
            "redirect" => {
                let target = record
                    .redirect_target
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or(RecordError::MissingRedirectTarget)?;
                Action::Redirect(Redirect {
                    target: target.to_string(),
                    preserve_suffix: record.redirect_preserve_path_suffix,
                    permanent: record.redirect_is_permanent,
                })
            }
            "gone" => Action::Gone,
            other => return Err(RecordError::UnknownActionKind(other.to_string())),
        };

        Ok(Route {
            incoming_path: normalize(&record.incoming_path),
            match_kind,
            action,
        })
    }

    fn skip(&mut self, record: String, error: RecordError) {
        tracing::warn!(record = %record, error = %error, "Skipping invalid record");
        self.report.skipped.push(SkippedRecord { record, error });
    }

    /// Freeze into an immutable table.
    pub fn build(mut self) -> (RouteTable, BuildReport) {
        self.report.routes = self.trie.len();
        self.report.backends = self.backends.len();

        let table = RouteTable::new(
            self.trie,
            self.backends,
            self.report.skipped.len(),
            self.revision,
            SystemTime::now(),
        );
        (table, self.report)
    }
}

/// Build a table from one store snapshot. Backends are registered before
/// any route is resolved.
pub fn build_table(snapshot: &StoreSnapshot, revision: Option<String>) -> (RouteTable, BuildReport) {
    let mut builder = TableBuilder::new().with_revision(revision);
    for backend in &snapshot.backends {
        builder.add_backend(backend);
    }
    for route in &snapshot.routes {
        builder.add_route(route);
    }
    builder.build()
}

/// Read the store and build a table. Fails only if the store does.
pub async fn load_table(store: &dyn RouteStore) -> Result<(RouteTable, BuildReport), StoreError> {
    let revision = store.revision().await?;
    let snapshot = store.fetch().await?;
    Ok(build_table(&snapshot, revision))
}
