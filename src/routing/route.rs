//! Validated, fully resolved routing entries.

use std::sync::Arc;

use axum::http::StatusCode;
use url::{Position, Url};

use crate::routing::builder::RecordError;
use crate::routing::trie::MatchKind;

/// An upstream service, parsed once at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    id: String,
    url: Url,
    authority: String,
    base_path: String,
}

impl Backend {
    /// Parse a backend from its stored id and URL.
    pub fn parse(id: &str, raw_url: &str) -> Result<Self, RecordError> {
        let url = Url::parse(raw_url).map_err(|e| RecordError::InvalidBackendUrl {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(RecordError::UnsupportedScheme {
                    id: id.to_string(),
                    scheme: other.to_string(),
                })
            }
        }

        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(RecordError::InvalidBackendUrl {
                id: id.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let authority = url[Position::BeforeHost..Position::AfterPort].to_string();
        let base_path = url.path().trim_end_matches('/').to_string();

        Ok(Self {
            id: id.to_string(),
            url,
            authority,
            base_path,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `http` or `https`.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// `host[:port]`, also used as the forwarded `Host` header.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Path prefix of the backend URL without a trailing `/` (often empty).
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Upstream path-and-query for an incoming request path.
    pub fn upstream_path_and_query(&self, path: &str, query: Option<&str>) -> String {
        let mut out = String::with_capacity(self.base_path.len() + path.len() + 16);
        out.push_str(&self.base_path);
        if !path.starts_with('/') {
            out.push('/');
        }
        out.push_str(path);
        if out.is_empty() {
            out.push('/');
        }
        if let Some(query) = query {
            out.push('?');
            out.push_str(query);
        }
        out
    }
}

/// Redirect instructions attached to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub preserve_suffix: bool,
    pub permanent: bool,
}

impl Redirect {
    pub fn status(&self) -> StatusCode {
        if self.permanent {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::FOUND
        }
    }

    /// Compute the `Location` for a request path matched `depth` segments
    /// deep.
    pub fn location(&self, request_path: &str, depth: usize, query: Option<&str>) -> String {
        if !self.preserve_suffix {
            return self.target.clone();
        }

        let (base, target_query) = match self.target.split_once('?') {
            Some((base, q)) => (base, Some(q)),
            None => (self.target.as_str(), None),
        };

        let mut location = base.to_string();
        let suffix = unmatched_suffix(request_path, depth);
        if !suffix.is_empty() {
            if !location.ends_with('/') {
                location.push('/');
            }
            location.push_str(suffix);
        }

        let queries = [target_query, query]
            .into_iter()
            .flatten()
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>();
        if !queries.is_empty() {
            location.push('?');
            location.push_str(&queries.join("&"));
        }
        location
    }
}

/// Part of `path` after its first `depth` segments, trailing `/` kept.
pub fn unmatched_suffix(path: &str, depth: usize) -> &str {
    let trimmed = path.trim_start_matches('/');
    if depth == 0 {
        return trimmed;
    }
    match trimmed.match_indices('/').nth(depth - 1) {
        Some((idx, _)) => &trimmed[idx + 1..],
        None => "",
    }
}

/// What to do with a matched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Backend(Arc<Backend>),
    Redirect(Redirect),
    Gone,
}

impl Action {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Backend(_) => "backend",
            Action::Redirect(_) => "redirect",
            Action::Gone => "gone",
        }
    }
}

/// A route ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Normalized incoming path.
    pub incoming_path: String,
    pub match_kind: MatchKind,
    pub action: Action,
}
