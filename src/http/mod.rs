//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → dispatch.rs (table lookup, one snapshot per request)
//!     → response.rs (not found / gone / redirect)
//!       or proxy.rs (forward to backend, stream response back)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::Dispatcher;
pub use proxy::{BackendProxy, ProxyBuildError};
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
