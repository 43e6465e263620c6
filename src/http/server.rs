//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the public listener
//! - Wire up middleware (request ID, tracing, body timeouts)
//! - Hand every request to the dispatcher
//! - Serve until shutdown, then drain
//!
//! # Design Decisions
//! - The public listener drives hyper connections itself so that request
//!   headers are bounded by the frontend read timeout
//! - Request and response bodies get idle timeouts from the same config

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::{RequestBodyTimeoutLayer, ResponseBodyTimeoutLayer},
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::http::dispatch::Dispatcher;
use crate::http::request::MakeRequestUuidV4;

/// Public-facing HTTP server.
pub struct HttpServer {
    router: Router,
    header_read_timeout: Duration,
}

impl HttpServer {
    pub fn new(dispatcher: Dispatcher, config: &ListenerConfig) -> Self {
        Self {
            router: Self::build_router(dispatcher, config),
            header_read_timeout: config.read_timeout,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(dispatcher: Dispatcher, config: &ListenerConfig) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(ResponseBodyTimeoutLayer::new(config.write_timeout))
            .layer(RequestBodyTimeoutLayer::new(config.read_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// The configured router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Clients that do not finish sending request headers within the read
    /// timeout are disconnected.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(listener = "public", address = %addr, "HTTP server starting");

        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.header_read_timeout);
        let graceful = GracefulShutdown::new();

        loop {
            let (stream, remote) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                },
                _ = shutdown.recv() => break,
            };

            let router = self.router.clone();
            let service = service_fn(move |mut request: Request<Incoming>| {
                request.extensions_mut().insert(ConnectInfo(remote));
                router.clone().oneshot(request)
            });

            let connection = builder
                .serve_connection(TokioIo::new(stream), service)
                .into_owned();
            let connection = graceful.watch(connection);
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::debug!(client = %remote, error = %e, "Connection closed with error");
                }
            });
        }

        drop(listener);
        tracing::info!(listener = "public", "Draining connections");
        graceful.shutdown().await;
        tracing::info!(listener = "public", "HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}

/// Serve `router` on `listener` until `shutdown` fires.
pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(listener = name, address = %addr, "HTTP server starting");

    let app = router.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!(listener = name, "HTTP server stopped");
    Ok(())
}
