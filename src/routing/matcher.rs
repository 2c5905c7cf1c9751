//! Path prefix matching.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Literal prefix only, no wildcards and no regex
//! - `/api` also matches `/apis`; rules needing a segment boundary declare
//!   the trailing slash

use serde::Serialize;

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}
