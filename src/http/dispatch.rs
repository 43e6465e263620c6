//! Request dispatch.
//!
//! Every request is answered from exactly one table snapshot: the current
//! table is loaded once, the matched route is cloned out of it and the
//! guard is released before any backend I/O starts.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::Response;

use crate::http::proxy::BackendProxy;
use crate::http::request::request_id;
use crate::http::response;
use crate::observability::metrics;
use crate::routing::{Action, Route, TableHandle};

#[derive(Clone, Debug)]
pub struct Dispatcher {
    table: TableHandle,
    proxy: BackendProxy,
}

impl Dispatcher {
    pub fn new(table: TableHandle, proxy: BackendProxy) -> Self {
        Self { table, proxy }
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    /// Answer `request` according to the current route table.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();

        let Some((route, depth)) = self.resolve(request.uri().path()) else {
            tracing::debug!(
                request_id = %request_id(&request),
                path = %request.uri().path(),
                "No route matched"
            );
            let response = response::not_found();
            metrics::record_request("not_found", response.status().as_u16(), start);
            return response;
        };

        let response = match &route.action {
            Action::Gone => response::gone(),
            Action::Redirect(redirect) => {
                let location = redirect.location(request.uri().path(), depth, request.uri().query());
                response::redirect(redirect.status(), &location)
            }
            Action::Backend(backend) => {
                let client_ip = client_ip(&request);
                self.proxy.forward(backend, request, client_ip).await
            }
        };

        metrics::record_request(route.action.kind(), response.status().as_u16(), start);
        response
    }

    fn resolve(&self, path: &str) -> Option<(Arc<Route>, usize)> {
        let table = self.table.load();
        table
            .lookup(path)
            .map(|found| (Arc::clone(found.route), found.depth))
    }
}

fn client_ip<B>(request: &Request<B>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
