//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::fragment::{fragment_path, LoadedFragment, SharedFragment};
use crate::config::schema::PipelineConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::output::path::{absolutize, normalize};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed in `{}`: {}", .path.display(), join_errors(.errors))]
    Validation {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },

    #[error("path `{}` climbs above the filesystem root", .0.display())]
    InvalidPath(PathBuf),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A loaded entry-point configuration with its paths made absolute.
#[derive(Debug, Clone)]
pub struct EntryConfig {
    /// Absolute path of the configuration file.
    pub path: PathBuf,

    /// Directory holding the configuration file. Relative paths in the
    /// file are resolved against it.
    pub base_dir: PathBuf,

    /// Absolute write boundary for build output.
    pub workspace_root: PathBuf,

    /// Included fragment, if any.
    pub fragment: Option<LoadedFragment>,

    /// Parsed configuration with the fragment merged in.
    pub config: PipelineConfig,
}

impl EntryConfig {
    /// Files whose modification should trigger a reload.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.path.clone()];
        if let Some(fragment) = &self.fragment {
            files.push(fragment.path.clone());
        }
        files
    }
}

/// Load, merge and validate an entry-point configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EntryConfig, ConfigError> {
    let path = absolute(path)?;
    let content = read(&path)?;
    let mut config: PipelineConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    let fragment = match &config.include {
        Some(include) => Some(load_fragment(&fragment_path(&base_dir, include))?),
        None => None,
    };

    if let Some(loaded) = &fragment {
        config.merge_fragment(&loaded.fragment);
        tracing::debug!(
            config = %path.display(),
            fragment = %loaded.path.display(),
            "Merged shared fragment"
        );
    }

    let workspace_root = match (&config.workspace_root, &fragment) {
        (Some(root), _) => base_dir.join(root),
        (None, Some(loaded)) => loaded.workspace_root(),
        (None, None) => base_dir.clone(),
    };
    let workspace_root = normalize(&workspace_root).ok_or(ConfigError::InvalidPath(workspace_root))?;

    validate_config(&config).map_err(|errors| ConfigError::Validation {
        path: path.clone(),
        errors,
    })?;

    Ok(EntryConfig {
        path,
        base_dir,
        workspace_root,
        fragment,
        config,
    })
}

/// Load a shared fragment file.
pub fn load_fragment(path: &Path) -> Result<LoadedFragment, ConfigError> {
    let path = absolute(path)?;
    let content = read(&path)?;
    let fragment: SharedFragment = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    Ok(LoadedFragment { path, dir, fragment })
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    let joined = absolutize(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    normalize(&joined).ok_or(ConfigError::InvalidPath(joined))
}
