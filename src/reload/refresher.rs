//! Periodic and on-demand rebuilds of the published route table.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::observability::metrics;
use crate::routing::{load_table, TableHandle};
use crate::store::RouteStore;

const TRIGGER_QUEUE: usize = 64;

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// A new table was built and published.
    Published {
        routes: usize,
        backends: usize,
        skipped: usize,
    },
    /// The store revision matched the published table; nothing was built.
    Unchanged,
    /// The store could not be read; the previous table stays published.
    Failed { error: String },
}

impl ReloadOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReloadOutcome::Published { .. } => "published",
            ReloadOutcome::Unchanged => "unchanged",
            ReloadOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("route refresher is not running")]
    Closed,
}

#[derive(Debug)]
struct ReloadRequest {
    reply: Option<oneshot::Sender<ReloadOutcome>>,
}

/// Asks the refresher for an out-of-cycle rebuild.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<ReloadRequest>,
}

impl ReloadHandle {
    /// Trigger a rebuild and wait for its outcome.
    pub async fn reload(&self) -> Result<ReloadOutcome, ReloadError> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(ReloadRequest { reply: Some(reply) })
            .await
            .map_err(|_| ReloadError::Closed)?;
        outcome.await.map_err(|_| ReloadError::Closed)
    }

    /// Trigger a rebuild without waiting.
    ///
    /// Returns `false` only when the refresher has stopped. A full queue
    /// already guarantees a rebuild, so the request is simply dropped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(ReloadRequest { reply: None }) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Owns the build-and-publish loop.
pub struct Refresher {
    store: Arc<dyn RouteStore>,
    table: TableHandle,
    interval: Duration,
    requests: mpsc::Receiver<ReloadRequest>,
}

impl Refresher {
    pub fn new(
        store: Arc<dyn RouteStore>,
        table: TableHandle,
        interval: Duration,
    ) -> (Self, ReloadHandle) {
        let (tx, requests) = mpsc::channel(TRIGGER_QUEUE);
        let refresher = Self {
            store,
            table,
            interval,
            requests,
        };
        (refresher, ReloadHandle { tx })
    }

    /// Run until shutdown. The first tick fires one interval from now; the
    /// initial table is expected to be published already.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Route refresher starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh(false).await;
                }
                Some(first) = self.requests.recv() => {
                    let mut replies: Vec<_> = first.reply.into_iter().collect();
                    while let Ok(next) = self.requests.try_recv() {
                        replies.extend(next.reply);
                    }
                    tracing::debug!(waiting = replies.len(), "Reload requested");

                    let outcome = self.refresh(true).await;
                    for reply in replies {
                        let _ = reply.send(outcome.clone());
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Route refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Rebuild and publish once.
    ///
    /// Unless `forced`, a matching store revision skips the rebuild.
    pub async fn refresh(&self, forced: bool) -> ReloadOutcome {
        let outcome = self.try_refresh(forced).await;
        metrics::record_reload(outcome.label());
        outcome
    }

    async fn try_refresh(&self, forced: bool) -> ReloadOutcome {
        if !forced {
            match self.store.revision().await {
                Ok(Some(revision)) => {
                    let current = self.table.load();
                    if current.revision() == Some(revision.as_str()) {
                        tracing::trace!(revision = %revision, "Store unchanged");
                        return ReloadOutcome::Unchanged;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read store revision, keeping current routes");
                    return ReloadOutcome::Failed { error: e.to_string() };
                }
            }
        }

        match load_table(self.store.as_ref()).await {
            Ok((table, report)) => {
                let outcome = ReloadOutcome::Published {
                    routes: report.routes,
                    backends: report.backends,
                    skipped: report.skipped.len(),
                };
                metrics::set_table_size(report.routes, report.backends);
                self.table.publish(table);

                tracing::info!(
                    routes = report.routes,
                    backends = report.backends,
                    skipped = report.skipped.len(),
                    overwritten = report.overwritten,
                    disabled = report.disabled,
                    "Route table published"
                );
                outcome
            }
            Err(e) => {
                tracing::error!(error = %e, "Route reload failed, keeping current routes");
                ReloadOutcome::Failed { error: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::routing::RouteTable;
    use crate::store::{BackendRecord, MemoryStore, RouteRecord};

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::from_records(
            vec![BackendRecord::new("svc", "http://127.0.0.1:3000")],
            vec![RouteRecord::backend("/", "prefix", "svc")],
        ))
    }

    async fn published(store: &MemoryStore) -> TableHandle {
        let (table, _) = load_table(store).await.unwrap();
        TableHandle::new(table)
    }

    #[tokio::test]
    async fn outage_keeps_previous_table() {
        let store = store();
        let table = published(&store).await;
        let (refresher, _handle) = Refresher::new(store.clone(), table.clone(), Duration::from_secs(60));

        store.push_route(RouteRecord::gone("/gone", "exact"));
        store.set_available(false);

        let outcome = refresher.refresh(true).await;
        assert!(matches!(outcome, ReloadOutcome::Failed { .. }));
        assert!(table.load().lookup("/gone").is_none());
        assert!(table.load().lookup("/anything").is_some());

        store.set_available(true);
        let outcome = refresher.refresh(true).await;
        assert!(matches!(outcome, ReloadOutcome::Published { routes: 2, .. }));
        assert!(table.load().lookup("/gone").is_some());
    }

    #[tokio::test]
    async fn unchanged_revision_skips_timer_rebuild() {
        let store = store();
        let table = published(&store).await;
        let (refresher, _handle) = Refresher::new(store.clone(), table, Duration::from_secs(60));
        let fetches = store.fetch_count();

        assert_eq!(refresher.refresh(false).await, ReloadOutcome::Unchanged);
        assert_eq!(store.fetch_count(), fetches);

        assert!(matches!(refresher.refresh(true).await, ReloadOutcome::Published { .. }));
        assert_eq!(store.fetch_count(), fetches + 1);
    }

    #[tokio::test]
    async fn handle_reload_publishes() {
        let store = store();
        let table = published(&store).await;
        let (refresher, handle) = Refresher::new(store.clone(), table.clone(), Duration::from_secs(60));
        let shutdown = Shutdown::new();
        let task = tokio::spawn(refresher.run(shutdown.subscribe()));

        store.push_route(RouteRecord::redirect("/old", "exact", "/new", true));
        let outcome = handle.reload().await.unwrap();

        assert_eq!(
            outcome,
            ReloadOutcome::Published {
                routes: 2,
                backends: 1,
                skipped: 0
            }
        );
        assert!(table.load().lookup("/old").is_some());

        shutdown.trigger();
        task.await.unwrap();
        assert!(matches!(handle.reload().await, Err(ReloadError::Closed)));
        assert!(!handle.request());
    }

    #[tokio::test]
    async fn queued_triggers_share_one_build() {
        let store = store();
        let table = TableHandle::new(RouteTable::empty());
        let (refresher, handle) = Refresher::new(store.clone(), table, Duration::from_secs(60));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.reload().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let shutdown = Shutdown::new();
        tokio::spawn(refresher.run(shutdown.subscribe()));

        for waiter in waiters {
            let outcome = waiter.await.unwrap().unwrap();
            assert!(matches!(outcome, ReloadOutcome::Published { .. }));
        }
        assert_eq!(store.fetch_count(), 1);
        shutdown.trigger();
    }

    #[tokio::test]
    async fn timer_picks_up_changes() {
        let store = store();
        let table = published(&store).await;
        let (refresher, _handle) = Refresher::new(store.clone(), table.clone(), Duration::from_millis(50));
        let shutdown = Shutdown::new();
        tokio::spawn(refresher.run(shutdown.subscribe()));

        store.push_route(RouteRecord::gone("/retired", "prefix"));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(table.load().lookup("/retired/page").is_some());
        shutdown.trigger();
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ReloadOutcome::Failed { error: "down".into() }).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "down");
    }
}
