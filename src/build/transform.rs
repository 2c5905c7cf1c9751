//! Transformer seam.
//!
//! The compiler, UI-framework and CSS collaborators live behind
//! [`Transformer`]. The engine hands each claimed file to the transformer
//! together with the plugin that claimed it.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::plugins::{PluginOptions, ResolvedPlugin};

/// A source file handed to a transformer.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    /// Path relative to the project root.
    pub path: &'a Path,
    pub contents: &'a [u8],
}

/// A file a transformer wants written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    /// Path relative to the output directory.
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Failure raised by a transformer. The cause is carried opaquely.
#[derive(Debug, Error)]
#[error("plugin `{plugin}` failed on `{}`", .path.display())]
pub struct TransformError {
    pub plugin: String,
    pub path: PathBuf,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl TransformError {
    pub fn new(plugin: &ResolvedPlugin, path: &Path, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            plugin: plugin.id.clone(),
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

pub trait Transformer: Send + Sync {
    /// Transform one claimed file into zero or more emitted files.
    fn transform(&self, plugin: &ResolvedPlugin, file: SourceFile<'_>) -> Result<Vec<Emitted>, TransformError>;
}

impl<T: Transformer + ?Sized> Transformer for &T {
    fn transform(&self, plugin: &ResolvedPlugin, file: SourceFile<'_>) -> Result<Vec<Emitted>, TransformError> {
        (**self).transform(plugin, file)
    }
}

/// Path a claimed file is emitted at. Compiler output takes the configured
/// extension, everything else keeps its name.
pub fn emitted_path(plugin: &ResolvedPlugin, path: &Path) -> PathBuf {
    match &plugin.options {
        PluginOptions::CompilerTransform { extension } => path.with_extension(extension),
        _ => path.to_path_buf(),
    }
}

/// Emits every claimed file with its contents unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransformer;

impl Transformer for CopyTransformer {
    fn transform(&self, plugin: &ResolvedPlugin, file: SourceFile<'_>) -> Result<Vec<Emitted>, TransformError> {
        Ok(vec![Emitted {
            path: emitted_path(plugin, file.path),
            contents: file.contents.to_vec(),
        }])
    }
}
