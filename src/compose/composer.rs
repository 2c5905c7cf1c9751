//! One-shot configuration composition.
//!
//! # States
//! ```text
//! Uninitialized → Composing → Ready(Arc<BuildConfiguration>)
//!                           → Failed(ComposeError)
//! ```
//!
//! # Design Decisions
//! - Fail fast: plugins, then proxy rules, then output; first error wins
//! - No partial configuration is ever published
//! - No retries; errors are a function of the input
//! - Terminal states are final, a new `Composer` composes again

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::loader::EntryConfig;
use crate::config::schema::{DevServerOptions, PluginRequest, ProxyRuleConfig};
use crate::output::path::ProjectRoot;
use crate::output::{resolve_output, OutputRequest, OutputTarget, PathResolutionError};
use crate::plugins::{Mode, PluginRegistry, PluginResolutionError, PluginSet};
use crate::routing::{ProxyRuleError, ProxyTable};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Plugin(#[from] PluginResolutionError),

    #[error(transparent)]
    Proxy(#[from] ProxyRuleError),

    #[error(transparent)]
    Path(#[from] PathResolutionError),

    #[error("composer is {0}; composition runs once per composer")]
    AlreadyStarted(&'static str),
}

/// Inputs of one composition.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub root: ProjectRoot,
    pub mode: Mode,
    pub plugins: Vec<PluginRequest>,
    pub proxy: Vec<ProxyRuleConfig>,
    pub output: OutputRequest,
    pub workspace_root: PathBuf,
    pub server: DevServerOptions,
}

impl ComposeRequest {
    /// Build a request from a loaded entry point.
    pub fn from_entry(entry: &EntryConfig, mode: Mode) -> Result<Self, ComposeError> {
        let config = &entry.config;
        let root = ProjectRoot::resolve(&entry.base_dir, config.root.as_deref().unwrap_or(Path::new(".")))?;

        Ok(Self {
            root,
            mode,
            plugins: config.plugins.clone(),
            proxy: config.proxy.clone(),
            output: config.output.clone().map(OutputRequest::from).unwrap_or_default(),
            workspace_root: entry.workspace_root.clone(),
            server: config.server.clone(),
        })
    }
}

/// Fully composed, immutable pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
    project_root: ProjectRoot,
    mode: Mode,
    plugins: PluginSet,
    proxy: ProxyTable,
    output: OutputTarget,
    server: DevServerOptions,
}

impl BuildConfiguration {
    pub fn project_root(&self) -> &Path {
        self.project_root.as_path()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    pub fn proxy(&self) -> &ProxyTable {
        &self.proxy
    }

    pub fn output(&self) -> &OutputTarget {
        &self.output
    }

    pub fn server(&self) -> &DevServerOptions {
        &self.server
    }
}

/// Compose a configuration without state tracking.
pub fn compose(registry: &PluginRegistry, request: ComposeRequest) -> Result<BuildConfiguration, ComposeError> {
    let plugins = registry.resolve(&request.plugins, request.mode)?;
    let proxy = ProxyTable::from_rules(&request.proxy)?;
    let output = resolve_output(&request.root, &request.output, &request.workspace_root)?;

    Ok(BuildConfiguration {
        project_root: request.root,
        mode: request.mode,
        plugins,
        proxy,
        output,
        server: request.server,
    })
}

/// Observable composition state.
#[derive(Debug, Clone, Default)]
pub enum ComposerState {
    #[default]
    Uninitialized,
    Composing,
    Ready(Arc<BuildConfiguration>),
    Failed(ComposeError),
}

impl ComposerState {
    pub fn name(&self) -> &'static str {
        match self {
            ComposerState::Uninitialized => "uninitialized",
            ComposerState::Composing => "composing",
            ComposerState::Ready(_) => "ready",
            ComposerState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ComposerState::Ready(_) | ComposerState::Failed(_))
    }
}

/// Runs a single composition and records its outcome.
#[derive(Debug, Default)]
pub struct Composer {
    registry: PluginRegistry,
    state: ComposerState,
}

impl Composer {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            state: ComposerState::Uninitialized,
        }
    }

    pub fn state(&self) -> &ComposerState {
        &self.state
    }

    /// Compose once. The result is also kept in [`Composer::state`].
    pub fn compose(&mut self, request: ComposeRequest) -> Result<Arc<BuildConfiguration>, ComposeError> {
        if !matches!(self.state, ComposerState::Uninitialized) {
            return Err(ComposeError::AlreadyStarted(self.state.name()));
        }

        self.state = ComposerState::Composing;
        tracing::debug!(
            root = %request.root.as_path().display(),
            mode = %request.mode,
            plugins = request.plugins.len(),
            proxy_rules = request.proxy.len(),
            "Composing configuration"
        );

        match compose(&self.registry, request) {
            Ok(config) => {
                let config = Arc::new(config);
                tracing::info!(
                    root = %config.project_root().display(),
                    mode = %config.mode(),
                    plugins = config.plugins().len(),
                    proxy_rules = config.proxy().len(),
                    output = %config.output().directory.display(),
                    clean = config.output().clean_before_write,
                    "Configuration ready"
                );
                self.state = ComposerState::Ready(config.clone());
                Ok(config)
            }
            Err(e) => {
                tracing::error!(error = %e, "Configuration failed");
                self.state = ComposerState::Failed(e.clone());
                Err(e)
            }
        }
    }
}
