//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table build (every refresh):
//!     StoreSnapshot (raw records)
//!     → builder.rs (validate, resolve backends)
//!     → trie.rs (insert exact/prefix slots)
//!     → table.rs (immutable RouteTable)
//!     → publisher.rs (atomic swap)
//!
//! Request:
//!     path → publisher.rs (load current table)
//!     → trie.rs (segment walk)
//!     → matched Route or NoMatch
//! ```
//!
//! # Design Decisions
//! - Tables are immutable once built; refresh swaps in a new one
//! - Lookup cost is bounded by the number of path segments
//! - Deterministic: exact beats prefix, deeper prefix beats shallower

pub mod builder;
pub mod publisher;
pub mod route;
pub mod table;
pub mod trie;

pub use builder::{build_table, load_table, BuildReport, RecordError, SkippedRecord, TableBuilder};
pub use publisher::TableHandle;
pub use route::{Action, Backend, Redirect, Route};
pub use table::{RouteMatch, RouteTable};
pub use trie::{MatchKind, PathTrie};
