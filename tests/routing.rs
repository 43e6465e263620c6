//! End-to-end routing through the public listener.

use std::sync::Arc;

use content_router::store::{BackendRecord, MemoryStore, RouteRecord};
use reqwest::StatusCode;

mod common;

async fn router_with(backend_status: u16) -> common::RunningRouter {
    let backend = common::start_echo_backend(backend_status).await;
    let store = Arc::new(MemoryStore::from_records(
        vec![BackendRecord::new("svc-a", format!("http://{backend}"))],
        vec![
            RouteRecord::backend("/foo", "prefix", "svc-a"),
            RouteRecord::redirect("/foo/bar", "exact", "/baz", true),
            RouteRecord::gone("/retired", "prefix"),
            RouteRecord::redirect("/docs", "prefix", "https://docs.example.com/v2", false).preserving_suffix(),
        ],
    ));
    common::start_router(common::test_config(), store).await
}

#[tokio::test]
async fn prefix_route_forwards_to_backend() {
    let router = router_with(200).await;
    let client = common::client();

    let res = client
        .get(router.url("/foo/x?q=1"))
        .header("host", "www.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let echoed = res.text().await.unwrap().to_lowercase();
    assert!(echoed.starts_with("get /foo/x?q=1 http/1.1"), "{echoed}");
    assert!(echoed.contains("x-forwarded-host: www.example.com"), "{echoed}");
    assert!(echoed.contains("x-forwarded-for: 127.0.0.1"), "{echoed}");
    assert!(echoed.contains("via: 1.1 content-router"), "{echoed}");
}

#[tokio::test]
async fn exact_redirect_beats_enclosing_prefix() {
    let router = router_with(200).await;
    let res = common::client().get(router.url("/foo/bar")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()["location"], "/baz");
    assert_eq!(res.headers()["cache-control"], "max-age=1800, public");

    // Deeper than the exact route: the prefix route applies.
    let res = common::client().get(router.url("/foo/bar/more")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn redirect_with_suffix() {
    let router = router_with(200).await;
    let res = common::client().get(router.url("/docs/a/b?x=1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "https://docs.example.com/v2/a/b?x=1");
}

#[tokio::test]
async fn gone_for_every_method() {
    let router = router_with(200).await;
    let client = common::client();
    for method in [reqwest::Method::GET, reqwest::Method::POST, reqwest::Method::DELETE] {
        let res = client.request(method, router.url("/retired/page")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::GONE);
    }
}

#[tokio::test]
async fn unmatched_path_is_not_found() {
    let router = router_with(200).await;
    let res = common::client().get(router.url("/nothing/here")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn backend_status_is_passed_through() {
    let router = router_with(500).await;
    let res = common::client().get(router.url("/foo")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
