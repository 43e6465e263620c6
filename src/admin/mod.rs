//! Administrative API, served on its own listener.
//!
//! # Routes
//! - `POST|PUT /reload`: rebuild the route table now and report the outcome
//! - `GET /healthcheck`: liveness
//! - `GET /stats`: size and age of the published table
//! - `GET /version`: build identity

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::reload::ReloadHandle;
use crate::routing::TableHandle;

/// Shared state for admin handlers.
#[derive(Clone, Debug)]
pub struct AdminState {
    pub table: TableHandle,
    pub reload: ReloadHandle,
    /// Upper bound on how long `/reload` waits for the rebuild.
    pub reload_wait: Duration,
    pub api_key: Option<Arc<str>>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/reload", post(reload).put(reload))
        .route("/healthcheck", get(healthcheck))
        .route("/stats", get(stats))
        .route("/version", get(version))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
