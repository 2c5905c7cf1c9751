//! Transformed assets for the dev server.
//!
//! # Responsibilities
//! - Find the plugin claiming a request path
//! - Run the claimed file through the [`Transformer`] and serve the result
//!
//! # Design Decisions
//! - Only plugins carrying `dev-middleware` serve transformed output
//! - A path with no claiming plugin, or no file behind it, falls through to
//!   static serving
//! - The response keeps the request URL; its content type follows the
//!   emitted path

use std::path::{Component, Path};

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::build::{SourceFile, Transformer};
use crate::compose::BuildConfiguration;
use crate::plugins::Capability;

/// Project-relative path for a request path, if it names a plain file path.
pub fn claimed_path(request_path: &str) -> Option<&Path> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    let mut components = relative.components().peekable();
    components.peek()?;
    components
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(relative)
}

/// Content type for an emitted file.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js" | "mjs" | "jsx") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("wasm") => "application/wasm",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Serve `request_path` through its claiming plugin.
///
/// Returns `None` when the path should be served as a plain file instead.
pub async fn transform_asset(
    transformer: &dyn Transformer,
    config: &BuildConfiguration,
    request_path: &str,
) -> Option<Response> {
    let relative = claimed_path(request_path)?;
    let plugin = config.plugins().claim(relative)?;
    if !plugin.capabilities.contains(Capability::DevMiddleware) {
        return None;
    }

    let file = config.project_root().join(relative);
    match tokio::fs::metadata(&file).await {
        Ok(meta) if meta.is_file() => {}
        _ => return None,
    }

    let contents = match tokio::fs::read(&file).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!(path = %file.display(), error = %e, "Cannot read claimed file");
            return Some((StatusCode::INTERNAL_SERVER_ERROR, "Cannot read file").into_response());
        }
    };

    let emitted = match transformer.transform(
        plugin,
        SourceFile {
            path: relative,
            contents: &contents,
        },
    ) {
        Ok(emitted) => emitted,
        Err(e) => {
            tracing::error!(plugin = %e.plugin, path = %e.path.display(), error = %e.source, "Transform failed");
            return Some((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response());
        }
    };

    let Some(first) = emitted.into_iter().next() else {
        return Some(StatusCode::NOT_FOUND.into_response());
    };

    tracing::debug!(
        plugin = %plugin.id,
        path = %relative.display(),
        emitted = %first.path.display(),
        "Serving transformed asset"
    );

    Some(
        (
            [
                (header::CONTENT_TYPE, content_type(&first.path)),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from(first.contents),
        )
            .into_response(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claimed_path_accepts_plain_paths() {
        assert_eq!(claimed_path("/App.fs"), Some(Path::new("App.fs")));
        assert_eq!(claimed_path("/components/Button.jsx"), Some(Path::new("components/Button.jsx")));
    }

    #[test]
    fn test_claimed_path_rejects_traversal() {
        assert_eq!(claimed_path("/"), None);
        assert_eq!(claimed_path("/../secret.js"), None);
        assert_eq!(claimed_path("/assets/../../etc/passwd"), None);
    }

    #[test]
    fn test_content_type_follows_emitted_extension() {
        assert_eq!(content_type(Path::new("App.fs.js")), "text/javascript; charset=utf-8");
        assert_eq!(content_type(Path::new("styles.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("App.fs")), "application/octet-stream");
    }
}
