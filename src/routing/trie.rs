//! Segment trie for path lookup.
//!
//! # Responsibilities
//! - Store one exact and one prefix value per path node
//! - Resolve a request path to its most specific value
//!
//! # Design Decisions
//! - Lookup cost depends on the number of segments, not on the number of
//!   stored paths
//! - Leading and trailing `/` are insignificant: `/a/b/`, `a/b` and `/a/b`
//!   are the same key; interior empty segments (`/a//b`) are kept
//! - Exact beats prefix; among prefixes the deepest wins
//! - Lookup never allocates

use std::collections::HashMap;

/// How a stored path matches request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Only the path itself.
    Exact,
    /// The path and everything below it.
    Prefix,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Prefix => "prefix",
        }
    }
}

impl std::str::FromStr for MatchKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(MatchKind::Exact),
            "prefix" => Ok(MatchKind::Prefix),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a path into its trie key segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_matches('/');
    (!trimmed.is_empty())
        .then(|| trimmed.split('/'))
        .into_iter()
        .flatten()
}

/// Canonical form of a path, as used for keys: `/` + segments joined by `/`.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    out.push_str(path.trim_matches('/'));
    out
}

#[derive(Debug)]
struct Node<T> {
    children: HashMap<String, Node<T>>,
    exact: Option<T>,
    prefix: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            exact: None,
            prefix: None,
        }
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieMatch<'a, T> {
    pub value: &'a T,
    pub kind: MatchKind,
    /// Number of request segments covered by the matched path.
    pub depth: usize,
}

/// Path trie holding up to one exact and one prefix value per node.
#[derive(Debug)]
pub struct PathTrie<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTrie<T> {
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }

    /// Store `value` in the `kind` slot of `path`.
    ///
    /// Returns the value previously held by that slot, if any.
    pub fn insert(&mut self, path: &str, kind: MatchKind, value: T) -> Option<T> {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node.children.entry(segment.to_string()).or_default();
        }

        let slot = match kind {
            MatchKind::Exact => &mut node.exact,
            MatchKind::Prefix => &mut node.prefix,
        };
        let previous = slot.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Find the most specific value for `path`.
    pub fn lookup(&self, path: &str) -> Option<TrieMatch<'_, T>> {
        let mut node = &self.root;
        let mut depth = 0;
        let mut fallback = node.prefix.as_ref().map(|value| TrieMatch {
            value,
            kind: MatchKind::Prefix,
            depth,
        });

        for segment in segments(path) {
            match node.children.get(segment) {
                Some(child) => {
                    node = child;
                    depth += 1;
                    if let Some(value) = node.prefix.as_ref() {
                        fallback = Some(TrieMatch {
                            value,
                            kind: MatchKind::Prefix,
                            depth,
                        });
                    }
                }
                None => return fallback,
            }
        }

        match node.exact.as_ref() {
            Some(value) => Some(TrieMatch {
                value,
                kind: MatchKind::Exact,
                depth,
            }),
            None => fallback,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
