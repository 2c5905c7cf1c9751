//! Lexical path helpers and the project root type.
//!
//! Pure functions: nothing here touches the filesystem except
//! [`absolutize`], which reads the current directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::output::PathResolutionError;

/// Normalize `.` and `..` segments without consulting the filesystem.
///
/// Returns `None` when an absolute path climbs above its root.
/// Relative paths keep leading `..` segments.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if path.is_absolute() {
                    return None;
                } else {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    Some(out)
}

/// Join a relative path onto the current directory.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Absolute, normalized directory holding the sources of one entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    /// Resolve `root` against the directory of the declaring config file.
    pub fn resolve(base_dir: &Path, root: &Path) -> Result<Self, PathResolutionError> {
        let joined = base_dir.join(root);
        if !joined.is_absolute() {
            return Err(PathResolutionError::RelativeRoot { root: joined });
        }
        normalize(&joined)
            .map(Self)
            .ok_or(PathResolutionError::AboveFilesystemRoot {
                requested: root.to_path_buf(),
                from: base_dir.to_path_buf(),
            })
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ProjectRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
