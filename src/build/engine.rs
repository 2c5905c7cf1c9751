//! Production build pass.
//!
//! # Responsibilities
//! - Clear the output directory when the write policy asks for it
//! - Walk the project root and route each file to its claiming plugin
//! - Write emitted files under the output directory
//!
//! # Design Decisions
//! - The first transform error aborts the pass
//! - The output directory is never walked as input
//! - Hidden entries and `node_modules` are skipped
//! - Emitted paths must resolve inside the output directory

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::build::transform::{SourceFile, TransformError, Transformer};
use crate::compose::BuildConfiguration;
use crate::output::path::normalize;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("I/O error at `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("walking `{}`: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(
        "refusing to clean `{}`: it contains the project root `{}`",
        .output.display(), .root.display()
    )]
    UnsafeClean { output: PathBuf, root: PathBuf },

    #[error(
        "plugin `{plugin}` emitted `{}`, which is outside the output directory `{}`",
        .path.display(), .output.display()
    )]
    EmitOutsideOutput {
        plugin: String,
        path: PathBuf,
        output: PathBuf,
    },
}

/// Counters from one build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub cleaned: bool,
    pub claimed: usize,
    pub skipped: usize,
    pub emitted: usize,
    /// Claimed file count per plugin id.
    pub per_plugin: BTreeMap<String, usize>,
}

/// Drives one build pass over a composed configuration.
pub struct BuildEngine<'a, T> {
    config: &'a BuildConfiguration,
    transformer: T,
}

impl<'a, T: Transformer> BuildEngine<'a, T> {
    pub fn new(config: &'a BuildConfiguration, transformer: T) -> Self {
        Self { config, transformer }
    }

    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let root = self.config.project_root();
        let output = &self.config.output().directory;
        let mut report = BuildReport::default();

        if self.config.output().clean_before_write {
            report.cleaned = clean_output(output, root)?;
        }
        fs::create_dir_all(output).map_err(|source| BuildError::Io {
            path: output.clone(),
            source,
        })?;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| include_entry(entry, output));

        for entry in walker {
            let entry = entry.map_err(|source| BuildError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let Some(plugin) = self.config.plugins().claim(relative) else {
                report.skipped += 1;
                continue;
            };

            let contents = fs::read(entry.path()).map_err(|source| BuildError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;

            let emitted = self.transformer.transform(
                plugin,
                SourceFile {
                    path: relative,
                    contents: &contents,
                },
            )?;

            report.claimed += 1;
            *report.per_plugin.entry(plugin.id.clone()).or_default() += 1;

            for file in emitted {
                let target = emit_target(output, &file.path).ok_or_else(|| BuildError::EmitOutsideOutput {
                    plugin: plugin.id.clone(),
                    path: file.path.clone(),
                    output: output.clone(),
                })?;
                write_emitted(&target, &file.contents)?;
                report.emitted += 1;
            }
        }

        tracing::info!(
            output = %output.display(),
            cleaned = report.cleaned,
            claimed = report.claimed,
            skipped = report.skipped,
            emitted = report.emitted,
            "Build pass complete"
        );
        Ok(report)
    }
}

/// Remove the output directory. Returns whether anything was removed.
fn clean_output(output: &Path, root: &Path) -> Result<bool, BuildError> {
    if root.starts_with(output) {
        return Err(BuildError::UnsafeClean {
            output: output.to_path_buf(),
            root: root.to_path_buf(),
        });
    }

    match fs::remove_dir_all(output) {
        Ok(()) => {
            tracing::info!(output = %output.display(), "Cleaned output directory");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(BuildError::Io {
            path: output.to_path_buf(),
            source,
        }),
    }
}

fn include_entry(entry: &DirEntry, output: &Path) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if entry.path() == output {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    !name.starts_with('.') && name != "node_modules"
}

/// Where an emitted file lands, or `None` when it would leave `output`.
fn emit_target(output: &Path, relative: &Path) -> Option<PathBuf> {
    if relative.is_absolute() {
        return None;
    }
    let target = normalize(&output.join(relative))?;
    (target.starts_with(output) && target != output).then_some(target)
}

fn write_emitted(target: &Path, contents: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| BuildError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(target, contents).map_err(|source| BuildError::Io {
        path: target.to_path_buf(),
        source,
    })
}
