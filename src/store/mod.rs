//! External route store subsystem.
//!
//! # Data Flow
//! ```text
//! document store (file, in-memory, ...)
//!     → RouteStore::fetch (raw, string-typed records)
//!     → routing::builder (validation + resolution)
//!     → RouteTable
//! ```
//!
//! # Design Decisions
//! - Records stay string-typed until the builder validates them
//! - An unreachable store is an error, an empty store is not
//! - Implementations return records in a stable order; the builder's
//!   duplicate policy (last record wins) depends on it

pub mod file;
pub mod memory;
pub mod records;

use async_trait::async_trait;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use records::{BackendRecord, RouteRecord, StoreSnapshot};

/// Error returned when the store cannot produce a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or read.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered, but its document could not be decoded.
    #[error("store document is malformed: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Source of truth for backends and routes.
#[async_trait]
pub trait RouteStore: Send + Sync + std::fmt::Debug {
    /// Read the full current set of backend and route records.
    async fn fetch(&self) -> Result<StoreSnapshot, StoreError>;

    /// Cheap token that changes whenever the store's contents change.
    ///
    /// `None` means the store cannot tell, and every poll rebuilds.
    async fn revision(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}
