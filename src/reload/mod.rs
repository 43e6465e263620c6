//! Route table refresh subsystem.
//!
//! # Data Flow
//! ```text
//! timer tick ─────────┐
//! admin /reload ──────┤
//! SIGHUP ─────────────┼─→ ReloadHandle → mpsc → Refresher (single consumer)
//! store watcher ──────┘                           → load_table(store)
//!                                                 → TableHandle::publish
//! ```
//!
//! # Design Decisions
//! - One consumer loop, so at most one build runs at a time
//! - Triggers that queue up during a build are answered by the next build
//! - A failed build never touches the published table
//! - No backoff: failures are retried on the next tick or trigger

pub mod refresher;
pub mod watcher;

pub use refresher::{ReloadError, ReloadHandle, ReloadOutcome, Refresher};
pub use watcher::StoreWatcher;
