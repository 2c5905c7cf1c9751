//! Configuration file watcher for dev-mode reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::compose::{compose_file_with, BuildConfiguration, ServerOverrides};
use crate::http::SharedConfig;
use crate::plugins::Mode;

/// Watches an entry point (and its fragment) and recomposes on change.
pub struct ConfigWatcher {
    entry: PathBuf,
    files: Vec<PathBuf>,
    mode: Mode,
    overrides: ServerOverrides,
    update_tx: mpsc::UnboundedSender<Arc<BuildConfiguration>>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for recomposed configurations.
    pub fn new(
        entry: PathBuf,
        files: Vec<PathBuf>,
        mode: Mode,
    ) -> (Self, mpsc::UnboundedReceiver<Arc<BuildConfiguration>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                entry,
                files,
                mode,
                overrides: ServerOverrides::default(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Reapply command-line `[server]` overrides on every recomposition.
    pub fn with_overrides(mut self, overrides: ServerOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let entry = self.entry.clone();
        let mode = self.mode;
        let overrides = self.overrides.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(config = %entry.display(), "Config change detected, recomposing");
                        match compose_file_with(&entry, mode, &overrides) {
                            Ok(config) => {
                                let _ = tx.send(config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Recomposition failed, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for file in &self.files {
            watcher.watch(file, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(files = ?self.files, "Config watcher started");
        Ok(watcher)
    }
}

/// Swap each recomposed configuration into the shared handle until shutdown.
pub async fn apply_updates(
    mut updates: mpsc::UnboundedReceiver<Arc<BuildConfiguration>>,
    shared: SharedConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    if config.server() != shared.load().server() {
                        tracing::warn!("[server] changes take effect after a restart");
                    }
                    tracing::info!(
                        proxy_rules = config.proxy().len(),
                        plugins = config.plugins().len(),
                        "Configuration reloaded"
                    );
                    shared.store(config);
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
