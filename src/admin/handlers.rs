use std::time::UNIX_EPOCH;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::reload::ReloadError;

#[derive(Serialize)]
pub struct TableStats {
    pub routes: usize,
    pub backends: usize,
    pub skipped: usize,
    pub revision: Option<String>,
    pub published_at: u64,
    pub backend_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: String,
}

pub async fn reload(State(state): State<AdminState>) -> Response {
    match tokio::time::timeout(state.reload_wait, state.reload.reload()).await {
        Ok(Ok(outcome)) => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(Err(ReloadError::Closed)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable" })),
        )
            .into_response(),
        Err(_) => {
            tracing::warn!(wait = ?state.reload_wait, "Reload still running when the wait bound elapsed");
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(serde_json::json!({ "status": "pending" })),
            )
                .into_response()
        }
    }
}

pub async fn healthcheck() -> &'static str {
    "OK"
}

pub async fn stats(State(state): State<AdminState>) -> Json<TableStats> {
    let table = state.table.snapshot();
    let published_at = table
        .built_at()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    Json(TableStats {
        routes: table.route_count(),
        backends: table.backend_count(),
        skipped: table.skipped(),
        revision: table.revision().map(str::to_string),
        published_at,
        backend_ids: table.backend_ids().into_iter().map(str::to_string).collect(),
    })
}

pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: crate::version_info(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::admin::{setup_admin_router, AdminState};
    use crate::lifecycle::shutdown::Shutdown;
    use crate::reload::Refresher;
    use crate::routing::{RouteTable, TableHandle};
    use crate::store::{BackendRecord, MemoryStore, RouteRecord};

    fn state(store: Arc<MemoryStore>, api_key: Option<&str>, shutdown: &Shutdown) -> AdminState {
        let table = TableHandle::new(RouteTable::empty());
        let (refresher, reload) = Refresher::new(store, table.clone(), Duration::from_secs(3600));
        tokio::spawn(refresher.run(shutdown.subscribe()));
        AdminState {
            table,
            reload,
            reload_wait: Duration::from_secs(5),
            api_key: api_key.map(Arc::from),
        }
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::from_records(
            vec![BackendRecord::new("svc-a", "http://127.0.0.1:9000")],
            vec![
                RouteRecord::backend("/foo", "prefix", "svc-a"),
                RouteRecord::gone("/old", "exact"),
            ],
        ))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn reload_publishes_and_stats_report_it() {
        let shutdown = Shutdown::new();
        let state = state(store(), None, &shutdown);
        let router = setup_admin_router(state);

        let response = router
            .clone()
            .oneshot(Request::post("/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["status"], "published");
        assert_eq!(outcome["routes"], 2);

        let response = router
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stats = body_json(response).await;
        assert_eq!(stats["routes"], 2);
        assert_eq!(stats["backends"], 1);
        assert_eq!(stats["backend_ids"][0], "svc-a");

        shutdown.trigger();
    }

    #[tokio::test]
    async fn reload_after_refresher_stopped_is_unavailable() {
        let shutdown = Shutdown::new();
        let state = state(store(), None, &shutdown);
        shutdown.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let response = setup_admin_router(state)
            .oneshot(Request::put("/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn api_key_is_enforced() {
        let shutdown = Shutdown::new();
        let router = setup_admin_router(state(store(), Some("s3cret"), &shutdown));

        let response = router
            .clone()
            .oneshot(Request::get("/healthcheck").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(
                Request::get("/healthcheck")
                    .header(header::AUTHORIZATION, "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        shutdown.trigger();
    }

    #[tokio::test]
    async fn version_reports_package() {
        let shutdown = Shutdown::new();
        let response = setup_admin_router(state(store(), None, &shutdown))
            .oneshot(Request::get("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let info = body_json(response).await;
        assert_eq!(info["name"], "content-router");
        shutdown.trigger();
    }
}
