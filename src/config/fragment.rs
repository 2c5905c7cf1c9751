//! Shared configuration fragment.
//!
//! # Responsibilities
//! - Hold the settings every entry point must agree on (proxy rules, output)
//! - Merge those settings under an entry point's own configuration
//!
//! # Design Decisions
//! - Fragment is declared once and included by each entry point
//! - Entry point values win for `output`; proxy rules are concatenated so a
//!   prefix declared in both places surfaces as a conflict at composition
//! - Unknown keys are rejected, a fragment only carries shared settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::schema::{OutputConfig, PipelineConfig, ProxyRuleConfig};

/// Settings shared across entry points.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SharedFragment {
    /// Write boundary, relative to the fragment file.
    pub workspace_root: Option<PathBuf>,

    /// Proxy rules every entry point serves.
    pub proxy: Vec<ProxyRuleConfig>,

    /// Output request every entry point emits to.
    pub output: Option<OutputConfig>,
}

/// A fragment together with the directory it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedFragment {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub fragment: SharedFragment,
}

impl LoadedFragment {
    /// Workspace boundary declared by the fragment, or the fragment's own
    /// directory when it declares none.
    pub fn workspace_root(&self) -> PathBuf {
        match &self.fragment.workspace_root {
            Some(root) => self.dir.join(root),
            None => self.dir.clone(),
        }
    }
}

impl PipelineConfig {
    /// Merge a shared fragment under this configuration.
    pub fn merge_fragment(&mut self, fragment: &SharedFragment) {
        let mut proxy = fragment.proxy.clone();
        proxy.append(&mut self.proxy);
        self.proxy = proxy;

        if self.output.is_none() {
            self.output = fragment.output.clone();
        }
    }
}

/// Resolve an `include` path against the directory of the including file.
pub fn fragment_path(base_dir: &Path, include: &Path) -> PathBuf {
    base_dir.join(include)
}
