//! Upstream request preparation.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the rule's target
//! - Rewrite `Host` and `Origin` when the rule asks for it, keeping the
//!   client's host in `x-forwarded-host`
//! - Strip hop-by-hop headers
//!
//! # Design Decisions
//! - The matched prefix is kept; the target's own path is prepended
//! - With `rewrite_origin` off, client headers pass through untouched

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::uri::{InvalidUri, Uri};

use crate::routing::ProxyRule;

/// Carries the client's `Host` when it was rewritten.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "upgrade",
];

/// URI of the upstream request for `original`.
pub fn upstream_uri(rule: &ProxyRule, original: &Uri) -> Result<Uri, InvalidUri> {
    let base = rule.target.path().trim_end_matches('/');
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{}{}{}", rule.target_origin(), base, path_and_query).parse()
}

/// Apply the rule's header policy to a request about to be forwarded.
pub fn prepare_headers(headers: &mut HeaderMap, rule: &ProxyRule) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }

    if !rule.rewrite_origin {
        return;
    }

    if let Some(original) = headers.get(header::HOST).cloned() {
        headers.insert(HeaderName::from_static(X_FORWARDED_HOST), original);
    }
    if let Ok(host) = HeaderValue::from_str(&rule.target_authority()) {
        headers.insert(header::HOST, host);
    }
    if headers.contains_key(header::ORIGIN) {
        if let Ok(origin) = HeaderValue::from_str(&rule.target_origin()) {
            headers.insert(header::ORIGIN, origin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProxyRuleConfig;
    use crate::routing::ProxyTable;

    fn rule(target: &str, rewrite: bool) -> ProxyRule {
        let table = ProxyTable::from_rules(&[ProxyRuleConfig::new("/api", target, rewrite)]).unwrap();
        table.resolve("/api").unwrap().clone()
    }

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let uri: Uri = "/api/users/42?expand=true".parse().unwrap();
        let upstream = upstream_uri(&rule("http://localhost:5000", true), &uri).unwrap();
        assert_eq!(upstream.to_string(), "http://localhost:5000/api/users/42?expand=true");
    }

    #[test]
    fn test_upstream_uri_prepends_target_path() {
        let uri: Uri = "/api/users".parse().unwrap();
        let upstream = upstream_uri(&rule("http://localhost:5000/v2/", false), &uri).unwrap();
        assert_eq!(upstream.to_string(), "http://localhost:5000/v2/api/users");
    }

    #[test]
    fn test_rewrite_origin_sets_host_and_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:5173"));
        headers.insert(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        prepare_headers(&mut headers, &rule("http://localhost:5000", true));

        assert_eq!(headers[header::HOST], "localhost:5000");
        assert_eq!(headers[header::ORIGIN], "http://localhost:5000");
        assert_eq!(headers[X_FORWARDED_HOST], "localhost:5173");
        assert!(!headers.contains_key(header::CONNECTION));
    }

    #[test]
    fn test_passthrough_without_rewrite() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:5173"));

        prepare_headers(&mut headers, &rule("http://localhost:5000", false));

        assert_eq!(headers[header::HOST], "localhost:5173");
        assert!(!headers.contains_key(header::ORIGIN));
        assert!(!headers.contains_key(X_FORWARDED_HOST));
    }

    #[test]
    fn test_origin_not_added_when_absent() {
        let mut headers = HeaderMap::new();
        prepare_headers(&mut headers, &rule("http://localhost:5000", true));
        assert!(!headers.contains_key(header::ORIGIN));
        assert_eq!(headers[header::HOST], "localhost:5000");
    }
}
