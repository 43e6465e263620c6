//! Forwarding requests to backends.
//!
//! # Responsibilities
//! - Own the pooled upstream client (plain HTTP and HTTPS)
//! - Rewrite the request URI onto the backend's base URL
//! - Bound connection setup and time-to-headers separately
//! - Turn transport failures into 503/504/502
//!
//! # Design Decisions
//! - One client for every backend, connections pooled per authority
//! - Upstream requests are always HTTP/1.1
//! - The header timer starts once the connection is up and the request
//!   body has been fully handed to it; slow uploads never count against it
//! - The response body is streamed back without buffering

use std::net::IpAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Request, Uri, Version};
use axum::response::{IntoResponse, Response};
use hyper::body::{Body as HttpBody, Frame, Incoming, SizeHint};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::{capture_connection, CaptureConnection, HttpConnector};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::oneshot;
use tokio::time;

use crate::config::BackendConfig;
use crate::http::request::request_id;
use crate::http::response::ProxyFailure;
use crate::net::tls::{self, CertificateVerification};
use crate::observability::metrics;
use crate::routing::Backend;
use crate::security::headers::{apply_forwarding, strip_hop_by_hop};

pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, UploadBody>;

#[derive(Debug, thiserror::Error)]
pub enum ProxyBuildError {
    #[error("upstream TLS configuration: {0}")]
    Tls(#[from] rustls::Error),
}

/// Shared upstream client plus the per-call timeouts.
#[derive(Clone, Debug)]
pub struct BackendProxy {
    client: UpstreamClient,
    connect_timeout: Duration,
    header_timeout: Duration,
}

impl BackendProxy {
    pub fn new(config: &BackendConfig) -> Result<Self, ProxyBuildError> {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(config.connect_timeout));
        http.set_nodelay(true);
        http.enforce_http(false);

        let tls = tls::client_config(CertificateVerification::from_skip_flag(config.tls_skip_verify))?;
        let https = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self {
            client,
            connect_timeout: config.connect_timeout,
            header_timeout: config.header_timeout,
        })
    }

    /// Forward `request` to `backend`, answering with an error response on failure.
    pub async fn forward(&self, backend: &Backend, request: Request<Body>, client_ip: Option<IpAddr>) -> Response {
        let id = request_id(&request);
        match self.try_forward(backend, request, client_ip).await {
            Ok(response) => response,
            Err(failure) => {
                metrics::record_backend_error(backend.id(), failure.label());
                tracing::warn!(
                    request_id = %id,
                    backend = %backend.id(),
                    failure = failure.label(),
                    "Backend request failed"
                );
                failure.into_response()
            }
        }
    }

    pub async fn try_forward(
        &self,
        backend: &Backend,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response, ProxyFailure> {
        let upstream = upstream_request(backend, request, client_ip).map_err(|e| {
            tracing::error!(backend = %backend.id(), error = %e, "Could not build upstream request");
            ProxyFailure::InvalidRequest
        })?;

        let (parts, body) = upstream.into_parts();
        let (body, sent) = UploadBody::new(body);
        let mut upstream = Request::from_parts(parts, body);
        let connected = capture_connection(&mut upstream);

        let call = self.client.request(upstream);
        tokio::pin!(call);
        let deadline = exchange_deadline(connected, sent, self.connect_timeout, self.header_timeout);

        let result = tokio::select! {
            biased;
            result = &mut call => result,
            failure = deadline => return Err(failure),
        };

        let response: axum::http::Response<Incoming> = match result {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                tracing::debug!(backend = %backend.id(), error = %e, "Backend connect failed");
                return Err(ProxyFailure::ConnectFailed);
            }
            Err(e) => {
                tracing::debug!(backend = %backend.id(), error = %e, "Backend transport error");
                return Err(ProxyFailure::Transport);
            }
        };

        let mut response = response.map(Body::new);
        strip_hop_by_hop(response.headers_mut());
        Ok(response)
    }
}

/// Resolves when one phase of a backend exchange overruns its budget.
///
/// Connection setup (TCP and TLS) gets `connect_timeout`. The header timer
/// starts only after the connection is up and the request body has been
/// handed over in full. Never resolves if the client gives up before
/// connecting; the client call reports that itself.
async fn exchange_deadline(
    mut connected: CaptureConnection,
    sent: oneshot::Receiver<()>,
    connect_timeout: Duration,
    header_timeout: Duration,
) -> ProxyFailure {
    let established = time::timeout(connect_timeout, async {
        connected.wait_for_connection_metadata().await.is_some()
    })
    .await;

    match established {
        Err(_) => return ProxyFailure::ConnectFailed,
        Ok(false) => std::future::pending::<()>().await,
        Ok(true) => {}
    }

    // A dropped sender means the body ended early; start the clock anyway.
    let _ = sent.await;
    time::sleep(header_timeout).await;
    ProxyFailure::HeaderTimeout
}

/// Request body that reports when its last frame has been handed to the
/// connection.
#[derive(Debug)]
pub struct UploadBody {
    inner: Body,
    sent: Option<oneshot::Sender<()>>,
}

impl UploadBody {
    fn new(inner: Body) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let mut body = Self { inner, sent: Some(tx) };
        // hyper never polls a body that is already at its end.
        if body.inner.is_end_stream() {
            body.finish();
        }
        (body, rx)
    }

    fn finish(&mut self) {
        if let Some(tx) = self.sent.take() {
            let _ = tx.send(());
        }
    }
}

impl HttpBody for UploadBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => self.finish(),
            Poll::Ready(Some(Ok(_))) if self.inner.is_end_stream() => self.finish(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Rewrite a client request so it targets `backend`.
pub fn upstream_request(
    backend: &Backend,
    request: Request<Body>,
    client_ip: Option<IpAddr>,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = backend.upstream_path_and_query(parts.uri.path(), parts.uri.query());
    let uri = Uri::builder()
        .scheme(backend.scheme())
        .authority(backend.authority())
        .path_and_query(path_and_query.as_str())
        .build()?;

    let original_host = parts
        .headers
        .get(header::HOST)
        .cloned()
        .or_else(|| parts.uri.authority().and_then(|a| HeaderValue::from_str(a.as_str()).ok()));

    strip_hop_by_hop(&mut parts.headers);
    apply_forwarding(&mut parts.headers, original_host, client_ip);
    parts.headers.insert(header::HOST, HeaderValue::from_str(backend.authority())?);

    parts.uri = uri;
    parts.version = Version::HTTP_11;
    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::headers::{X_FORWARDED_FOR, X_FORWARDED_HOST};
    use std::net::Ipv4Addr;

    fn backend() -> Backend {
        Backend::parse("svc-a", "http://10.0.0.5:9000/base").unwrap()
    }

    #[test]
    fn rewrites_uri_and_headers() {
        let request = Request::builder()
            .uri("/foo/x?q=1")
            .header(header::HOST, "www.example.com")
            .header(header::CONNECTION, "close")
            .body(Body::empty())
            .unwrap();

        let upstream = upstream_request(&backend(), request, Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)))).unwrap();

        assert_eq!(upstream.uri().to_string(), "http://10.0.0.5:9000/base/foo/x?q=1");
        assert_eq!(upstream.version(), Version::HTTP_11);
        assert_eq!(upstream.headers()[header::HOST], "10.0.0.5:9000");
        assert_eq!(upstream.headers()[X_FORWARDED_HOST], "www.example.com");
        assert_eq!(upstream.headers()[X_FORWARDED_FOR], "192.0.2.7");
        assert!(upstream.headers().get(header::CONNECTION).is_none());
    }

    #[test]
    fn keeps_method_and_body_headers() {
        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let upstream = upstream_request(&backend(), request, None).unwrap();
        assert_eq!(upstream.method(), "POST");
        assert_eq!(upstream.headers()[header::CONTENT_TYPE], "application/json");
        assert!(upstream.headers().get(X_FORWARDED_FOR).is_none());
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let proxy = BackendProxy::new(&BackendConfig::default()).unwrap();
        let backend = Backend::parse("gone", &format!("http://{addr}")).unwrap();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = proxy.forward(&backend, request, None).await;
        assert_eq!(response.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    async fn next_frame(body: &mut UploadBody) -> Option<Result<Frame<Bytes>, axum::Error>> {
        std::future::poll_fn(|cx| Pin::new(&mut *body).poll_frame(cx)).await
    }

    #[tokio::test]
    async fn empty_body_counts_as_sent_immediately() {
        let (_body, mut sent) = UploadBody::new(Body::empty());
        assert!(sent.try_recv().is_ok());
    }

    #[tokio::test]
    async fn body_counts_as_sent_after_last_frame() {
        let (mut body, mut sent) = UploadBody::new(Body::from("payload"));
        assert!(sent.try_recv().is_err());

        let frame = next_frame(&mut body).await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"payload"));
        while next_frame(&mut body).await.is_some() {}

        assert!(sent.await.is_ok());
    }

    #[tokio::test]
    async fn stalled_connection_setup_is_connect_failure() {
        let mut request = Request::new(());
        let connected = capture_connection(&mut request);
        let (_tx, sent) = oneshot::channel();

        let start = std::time::Instant::now();
        let failure = exchange_deadline(connected, sent, Duration::from_millis(100), Duration::from_secs(30)).await;

        assert_eq!(failure, ProxyFailure::ConnectFailed);
        assert_eq!(failure.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
        assert!(start.elapsed() < Duration::from_secs(5));
        drop(request);
    }
}
