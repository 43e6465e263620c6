//! Raw records as they are kept in the store.

use serde::{Deserialize, Serialize};

/// A backend as stored: an id and a base URL, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendRecord {
    pub id: String,
    pub url: String,
}

impl BackendRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// A route as stored.
///
/// `match_kind` and `action_kind` are plain strings here; the table builder
/// decides whether they mean anything.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteRecord {
    pub incoming_path: String,

    /// `exact` or `prefix`.
    pub match_kind: String,

    /// `backend`, `redirect` or `gone`.
    pub action_kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,

    #[serde(default)]
    pub redirect_preserve_path_suffix: bool,

    #[serde(default = "default_permanent")]
    pub redirect_is_permanent: bool,

    #[serde(default)]
    pub disabled: bool,
}

fn default_permanent() -> bool {
    true
}

impl RouteRecord {
    fn bare(path: &str, match_kind: &str, action_kind: &str) -> Self {
        Self {
            incoming_path: path.to_string(),
            match_kind: match_kind.to_string(),
            action_kind: action_kind.to_string(),
            backend_id: None,
            redirect_target: None,
            redirect_preserve_path_suffix: false,
            redirect_is_permanent: true,
            disabled: false,
        }
    }

    /// A route proxying to `backend_id`.
    pub fn backend(path: &str, match_kind: &str, backend_id: &str) -> Self {
        Self {
            backend_id: Some(backend_id.to_string()),
            ..Self::bare(path, match_kind, "backend")
        }
    }

    /// A redirect route.
    pub fn redirect(path: &str, match_kind: &str, target: &str, permanent: bool) -> Self {
        Self {
            redirect_target: Some(target.to_string()),
            redirect_is_permanent: permanent,
            ..Self::bare(path, match_kind, "redirect")
        }
    }

    /// A route answering 410 Gone.
    pub fn gone(path: &str, match_kind: &str) -> Self {
        Self::bare(path, match_kind, "gone")
    }

    /// Keep the unmatched part of the request path when redirecting.
    pub fn preserving_suffix(mut self) -> Self {
        self.redirect_preserve_path_suffix = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Everything the store holds at one point in time, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub backends: Vec<BackendRecord>,
    pub routes: Vec<RouteRecord>,
}
