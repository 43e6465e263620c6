//! Responses produced by the router itself.
//!
//! # Responsibilities
//! - Not found, gone and redirect responses
//! - Map backend failures to status codes
//!
//! # Design Decisions
//! - Connect failures are 503, header timeouts 504, anything else 502
//! - Redirects are cacheable for 30 minutes

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// `Cache-Control` sent with redirects.
pub const REDIRECT_CACHE_CONTROL: &str = "max-age=1800, public";

/// Why a proxied call produced no backend response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyFailure {
    /// Connection refused, connect timeout or TLS handshake failure.
    ConnectFailed,
    /// The backend did not send response headers in time.
    HeaderTimeout,
    /// Any other transport error.
    Transport,
    /// The upstream request could not be constructed.
    InvalidRequest,
}

impl ProxyFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyFailure::ConnectFailed => StatusCode::SERVICE_UNAVAILABLE,
            ProxyFailure::HeaderTimeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyFailure::Transport | ProxyFailure::InvalidRequest => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProxyFailure::ConnectFailed => "connect",
            ProxyFailure::HeaderTimeout => "header_timeout",
            ProxyFailure::Transport => "transport",
            ProxyFailure::InvalidRequest => "invalid_request",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ProxyFailure::ConnectFailed => "Backend unavailable",
            ProxyFailure::HeaderTimeout => "Backend timed out",
            ProxyFailure::Transport | ProxyFailure::InvalidRequest => "Bad gateway",
        }
    }
}

impl IntoResponse for ProxyFailure {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

pub fn gone() -> Response {
    (StatusCode::GONE, "Gone").into_response()
}

/// Redirect to `location` with a 301 or 302 `status`.
pub fn redirect(status: StatusCode, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (
            status,
            [
                (header::LOCATION, location),
                (header::CACHE_CONTROL, HeaderValue::from_static(REDIRECT_CACHE_CONTROL)),
            ],
        )
            .into_response(),
        Err(_) => {
            tracing::error!(location = %location, "Redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
