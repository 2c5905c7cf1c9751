//! Proxy rule lookup.
//!
//! # Responsibilities
//! - Store compiled proxy rules
//! - Look up the rule for a request path
//! - Return matched rule or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules kept sorted longest prefix first, so the first hit is the longest
//! - O(n) path prefix scan (acceptable for typical rule counts)
//! - Explicit `None` rather than silent default; the caller serves assets

use std::cmp::Reverse;

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyRuleConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// Two rules declared the same prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate proxy prefix `{prefix}` (targets `{first_target}` and `{second_target}`)")]
pub struct ProxyRuleConflictError {
    pub prefix: String,
    pub first_target: String,
    pub second_target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyRuleError {
    #[error(transparent)]
    Conflict(#[from] ProxyRuleConflictError),

    #[error("proxy rule `{prefix}`: prefix must start with `/`")]
    InvalidPrefix { prefix: String },

    #[error("proxy rule `{prefix}`: invalid target `{target}`: {reason}")]
    InvalidTarget {
        prefix: String,
        target: String,
        reason: String,
    },
}

/// A compiled proxy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyRule {
    #[serde(rename = "prefix")]
    matcher: PathPrefixMatcher,
    pub target: Url,
    pub rewrite_origin: bool,
}

impl ProxyRule {
    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// `scheme://host[:port]` of the target.
    pub fn target_origin(&self) -> String {
        self.target.origin().ascii_serialization()
    }

    /// `host[:port]` of the target, as sent in a `Host` header.
    pub fn target_authority(&self) -> String {
        let host = self.target.host_str().unwrap_or_default();
        match self.target.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

/// Immutable table of proxy rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProxyTable {
    rules: Vec<ProxyRule>,
}

impl ProxyTable {
    /// Compile rules, rejecting duplicates and malformed entries.
    pub fn from_rules(configs: &[ProxyRuleConfig]) -> Result<Self, ProxyRuleError> {
        let mut rules: Vec<ProxyRule> = Vec::with_capacity(configs.len());

        for config in configs {
            if !config.prefix.starts_with('/') {
                return Err(ProxyRuleError::InvalidPrefix {
                    prefix: config.prefix.clone(),
                });
            }

            if let Some(existing) = rules.iter().find(|r| r.prefix() == config.prefix) {
                return Err(ProxyRuleConflictError {
                    prefix: config.prefix.clone(),
                    first_target: existing.target.to_string(),
                    second_target: config.target.clone(),
                }
                .into());
            }

            let target = parse_target(config)?;
            rules.push(ProxyRule {
                matcher: PathPrefixMatcher::new(config.prefix.clone()),
                target,
                rewrite_origin: config.rewrite_origin,
            });
        }

        rules.sort_by(|a, b| {
            Reverse(a.prefix().len())
                .cmp(&Reverse(b.prefix().len()))
                .then_with(|| a.prefix().cmp(b.prefix()))
        });

        Ok(Self { rules })
    }

    /// Longest-prefix match for `path`.
    pub fn resolve(&self, path: &str) -> Option<&ProxyRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, prefix: &str) -> Option<&ProxyRule> {
        self.rules.iter().find(|r| r.prefix() == prefix)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProxyRule> {
        self.rules.iter()
    }
}

fn parse_target(config: &ProxyRuleConfig) -> Result<Url, ProxyRuleError> {
    let invalid = |reason: String| ProxyRuleError::InvalidTarget {
        prefix: config.prefix.clone(),
        target: config.target.clone(),
        reason,
    };

    let url = Url::parse(&config.target).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}
