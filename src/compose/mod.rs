//! Configuration composition subsystem.
//!
//! # Data Flow
//! ```text
//! viaduct.toml (+ shared fragment)
//!     → config::loader (EntryConfig)
//!     → ComposeRequest::from_entry (project root resolved)
//!     → composer.rs
//!         → plugins::PluginRegistry::resolve
//!         → routing::ProxyTable::from_rules
//!         → output::resolve_output
//!     → Arc<BuildConfiguration> (immutable)
//!     → build engine / dev server
//!
//! Several entry points:
//!     BuildConfiguration × BuildConfiguration
//!     → convergence.rs (same output dir, same proxy table)
//! ```
//!
//! # Design Decisions
//! - Composition is synchronous and does no I/O beyond path arithmetic
//! - The composed value is shared by `Arc`, never mutated
//! - Reload produces a new value rather than editing the old one

pub mod composer;
pub mod convergence;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::DevServerOptions;
use crate::plugins::{Mode, PluginRegistry};

pub use composer::{compose, BuildConfiguration, ComposeError, ComposeRequest, Composer, ComposerState};
pub use convergence::{check_convergence, ConvergenceError, ConvergencePolicy, Divergence};

/// Failure to turn a config file into a configuration.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}: {source}", .path.display())]
    Compose {
        path: std::path::PathBuf,
        #[source]
        source: ComposeError,
    },
}

/// `[server]` values fixed on the command line. They survive reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServerOverrides {
    pub fn apply(&self, server: &mut DevServerOptions) {
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
    }
}

/// Load an entry point and compose it with the built-in registry.
pub fn compose_file(path: &Path, mode: Mode) -> Result<Arc<BuildConfiguration>, EntryError> {
    compose_file_with(path, mode, &ServerOverrides::default())
}

/// Like [`compose_file`], with command-line `[server]` overrides applied.
pub fn compose_file_with(
    path: &Path,
    mode: Mode,
    overrides: &ServerOverrides,
) -> Result<Arc<BuildConfiguration>, EntryError> {
    let entry = load_config(path)?;
    let compose_err = |source: ComposeError| EntryError::Compose {
        path: entry.path.clone(),
        source,
    };

    let mut request = ComposeRequest::from_entry(&entry, mode).map_err(compose_err)?;
    overrides.apply(&mut request.server);
    let mut composer = Composer::new(PluginRegistry::builtin());
    composer.compose(request).map_err(compose_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_overrides_replace_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viaduct.toml");
        fs::write(
            &path,
            r#"
            [server]
            host = "0.0.0.0"
            port = 3000
            request_timeout_secs = 5
            "#,
        )
        .unwrap();

        let plain = compose_file(&path, Mode::Dev).unwrap();
        assert_eq!(plain.server().port, 3000);

        let overrides = ServerOverrides {
            host: None,
            port: Some(8080),
        };
        let config = compose_file_with(&path, Mode::Dev, &overrides).unwrap();
        assert_eq!(config.server().host, "0.0.0.0");
        assert_eq!(config.server().port, 8080);
        assert_eq!(config.server().request_timeout_secs, 5);
    }
}
