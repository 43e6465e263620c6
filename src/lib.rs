//! Content router library.
//!
//! A reverse-proxy router that answers each request from an immutable,
//! periodically rebuilt route table: forward to a backend, redirect, or
//! report the content as gone.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod reload;
pub mod routing;
pub mod security;
pub mod store;

pub use config::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::{RouterApp, Shutdown};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package version plus the build revision, when one was baked in through
/// `ROUTER_BUILD_REVISION` at compile time.
pub fn version_info() -> String {
    match option_env!("ROUTER_BUILD_REVISION") {
        Some(revision) if !revision.is_empty() => format!("{VERSION} ({revision})"),
        _ => VERSION.to_string(),
    }
}
