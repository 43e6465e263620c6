//! Filesystem watcher for the file-backed store.
//!
//! Changes to the document trigger a reload right away instead of waiting
//! for the next poll. The poll keeps running either way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::reload::ReloadHandle;

/// Watches the store document and fires reload triggers.
pub struct StoreWatcher {
    path: PathBuf,
    reload: ReloadHandle,
}

impl StoreWatcher {
    pub fn new(path: &Path, reload: ReloadHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            reload,
        }
    }

    /// Start watching in notify's background thread.
    ///
    /// The returned watcher must be kept alive for as long as events should
    /// be delivered.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let reload = self.reload.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Store document change detected, reloading routes");
                        if !reload.request() {
                            tracing::warn!("Route refresher has stopped, ignoring store change");
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Store watcher started");
        Ok(watcher)
    }
}
