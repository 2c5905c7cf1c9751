//! Output resolution.
//!
//! # Data Flow
//! ```text
//! ProjectRoot + OutputRequest (relative dir, clean flag)
//!     → join + lexical normalization (path.rs)
//!     → workspace boundary check
//!     → OutputTarget (absolute dir, write policy)
//! ```
//!
//! # Design Decisions
//! - Resolution is lexical: the output directory need not exist yet
//! - Anything outside the workspace root is refused
//! - Cleaning is opt-in; the default write policy is incremental

pub mod path;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::schema::OutputConfig;
use path::{normalize, ProjectRoot};

/// Output directory requested by a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    /// Directory relative to the project root.
    pub relative_out_dir: PathBuf,
    /// Clear the directory before writing.
    pub clean: bool,
}

impl Default for OutputRequest {
    fn default() -> Self {
        OutputConfig::default().into()
    }
}

impl From<OutputConfig> for OutputRequest {
    fn from(config: OutputConfig) -> Self {
        Self {
            relative_out_dir: config.dir,
            clean: config.clean,
        }
    }
}

/// Resolved output location and write policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputTarget {
    pub directory: PathBuf,
    pub clean_before_write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathResolutionError {
    #[error(
        "output directory `{}` resolves to `{}`, outside the workspace root `{}`",
        .requested.display(), .resolved.display(), .boundary.display()
    )]
    EscapesWorkspace {
        requested: PathBuf,
        resolved: PathBuf,
        boundary: PathBuf,
    },

    #[error("path `{}` climbs above the filesystem root from `{}`", .requested.display(), .from.display())]
    AboveFilesystemRoot { requested: PathBuf, from: PathBuf },

    #[error("project root `{}` is not absolute", .root.display())]
    RelativeRoot { root: PathBuf },
}

/// Resolve the output directory of one configuration.
pub fn resolve_output(
    root: &ProjectRoot,
    request: &OutputRequest,
    boundary: &Path,
) -> Result<OutputTarget, PathResolutionError> {
    let joined = root.as_path().join(&request.relative_out_dir);
    let resolved = normalize(&joined).ok_or_else(|| PathResolutionError::AboveFilesystemRoot {
        requested: request.relative_out_dir.clone(),
        from: root.as_path().to_path_buf(),
    })?;

    let boundary = normalize(boundary).ok_or_else(|| PathResolutionError::AboveFilesystemRoot {
        requested: boundary.to_path_buf(),
        from: PathBuf::from("/"),
    })?;

    if !resolved.starts_with(&boundary) {
        return Err(PathResolutionError::EscapesWorkspace {
            requested: request.relative_out_dir.clone(),
            resolved,
            boundary,
        });
    }

    Ok(OutputTarget {
        directory: resolved,
        clean_before_write: request.clean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(dir: &str, clean: bool) -> OutputRequest {
        OutputRequest {
            relative_out_dir: PathBuf::from(dir),
            clean,
        }
    }

    fn client_root() -> ProjectRoot {
        ProjectRoot::resolve(Path::new("/repo"), Path::new("src/Client")).unwrap()
    }

    #[test]
    fn test_resolves_two_levels_up() {
        let target = resolve_output(&client_root(), &request("../../deploy/public", true), Path::new("/repo")).unwrap();
        assert_eq!(target.directory, PathBuf::from("/repo/deploy/public"));
        assert!(target.clean_before_write);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let req = request("../../deploy/public", false);
        let first = resolve_output(&client_root(), &req, Path::new("/repo")).unwrap();
        let second = resolve_output(&client_root(), &req, Path::new("/repo")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_escaping_workspace_is_rejected() {
        let err = resolve_output(&client_root(), &request("../../../elsewhere", false), Path::new("/repo")).unwrap_err();
        match err {
            PathResolutionError::EscapesWorkspace { resolved, .. } => {
                assert_eq!(resolved, PathBuf::from("/elsewhere"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sibling_with_common_prefix_is_outside() {
        let root = ProjectRoot::resolve(Path::new("/repo"), Path::new(".")).unwrap();
        let err = resolve_output(&root, &request("../repo-dist", false), Path::new("/repo"));
        assert!(matches!(err, Err(PathResolutionError::EscapesWorkspace { .. })));
    }

    #[test]
    fn test_climbing_above_filesystem_root() {
        let err = resolve_output(&client_root(), &request("../../../../../x", false), Path::new("/"));
        assert!(matches!(err, Err(PathResolutionError::AboveFilesystemRoot { .. })));
    }

    #[test]
    fn test_default_request_is_incremental() {
        let req = OutputRequest::default();
        assert_eq!(req.relative_out_dir, PathBuf::from("dist"));
        assert!(!req.clean);
    }
}
