//! Plugin lookup and resolution.
//!
//! # Responsibilities
//! - Map plugin ids to kinds
//! - Validate activation options against the kind's schema
//! - Enforce one plugin per kind slot and the mode's required capabilities
//! - Decide which plugin claims a file (first match wins)

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::schema::PluginRequest;
use crate::plugins::kind::{Capability, CapabilitySet, Mode, PluginKind, PluginOptions, RuntimeMode};

/// Why a plugin could not be resolved. Always names the first offender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginResolutionError {
    #[error("plugins[{index}] `{id}`: unknown plugin id")]
    UnknownPlugin { index: usize, id: String },

    #[error("plugins[{index}] `{id}`: malformed options: {reason}")]
    MalformedOptions { index: usize, id: String, reason: String },

    #[error(
        "plugins[{index}] `{id}`: capability conflict with plugins[{previous_index}] `{previous_id}` in the {kind} slot"
    )]
    CapabilityConflict {
        index: usize,
        id: String,
        previous_index: usize,
        previous_id: String,
        kind: PluginKind,
    },

    #[error("plugins[{index}] `{id}`: lacks {capability}, required in {mode} mode")]
    MissingCapability {
        index: usize,
        id: String,
        capability: Capability,
        mode: Mode,
    },
}

impl PluginResolutionError {
    /// Id of the plugin that failed.
    pub fn plugin_id(&self) -> &str {
        match self {
            PluginResolutionError::UnknownPlugin { id, .. }
            | PluginResolutionError::MalformedOptions { id, .. }
            | PluginResolutionError::CapabilityConflict { id, .. }
            | PluginResolutionError::MissingCapability { id, .. } => id,
        }
    }
}

/// Compiled include pattern.
#[derive(Debug, Clone)]
pub struct IncludePattern(Regex);

impl IncludePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.0.is_match(&path.to_string_lossy())
    }
}

impl PartialEq for IncludePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for IncludePattern {}

impl Serialize for IncludePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A plugin activation that passed resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPlugin {
    pub id: String,
    /// Position in the configured sequence. Lower wins overlapping matches.
    pub precedence: usize,
    pub options: PluginOptions,
    pub include: IncludePattern,
    pub capabilities: CapabilitySet,
}

impl ResolvedPlugin {
    pub fn kind(&self) -> PluginKind {
        self.options.kind()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.include.matches(path)
    }
}

/// Ordered, resolved plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PluginSet {
    plugins: Vec<ResolvedPlugin>,
}

impl PluginSet {
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedPlugin> {
        self.plugins.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ResolvedPlugin> {
        self.plugins.iter().find(|p| p.id == id)
    }

    /// The plugin that processes `path`: the earliest in the sequence whose
    /// include pattern matches. Later plugins are never consulted.
    pub fn claim(&self, path: &Path) -> Option<&ResolvedPlugin> {
        self.plugins.iter().find(|p| p.matches(path))
    }

    /// Plugins providing `capability`, in precedence order.
    pub fn with_capability(&self, capability: Capability) -> impl Iterator<Item = &ResolvedPlugin> {
        self.plugins
            .iter()
            .filter(move |p| p.capabilities.contains(capability))
    }
}

impl<'a> IntoIterator for &'a PluginSet {
    type Item = &'a ResolvedPlugin;
    type IntoIter = std::slice::Iter<'a, ResolvedPlugin>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}

/// Known plugin ids.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    entries: HashMap<String, PluginKind>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PluginRegistry {
    /// Registry with no ids at all.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the built-in ids and the kind names themselves.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in [
            PluginKind::UiFrameworkTransform,
            PluginKind::CompilerTransform,
            PluginKind::CssUtilityTransform,
        ] {
            registry.register(kind.as_str(), kind);
        }
        registry.register("react", PluginKind::UiFrameworkTransform);
        registry.register("@vitejs/plugin-react", PluginKind::UiFrameworkTransform);
        registry.register("fable", PluginKind::CompilerTransform);
        registry.register("vite-plugin-fable", PluginKind::CompilerTransform);
        registry.register("tailwind", PluginKind::CssUtilityTransform);
        registry.register("@tailwindcss/vite", PluginKind::CssUtilityTransform);
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, kind: PluginKind) {
        self.entries.insert(id.into(), kind);
    }

    pub fn lookup(&self, id: &str) -> Option<PluginKind> {
        self.entries.get(id).copied()
    }

    /// Resolve requests in order, stopping at the first failure.
    pub fn resolve(&self, requests: &[PluginRequest], mode: Mode) -> Result<PluginSet, PluginResolutionError> {
        let mut plugins: Vec<ResolvedPlugin> = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            let kind = self
                .lookup(&request.id)
                .ok_or_else(|| PluginResolutionError::UnknownPlugin {
                    index,
                    id: request.id.clone(),
                })?;

            let malformed = |reason: String| PluginResolutionError::MalformedOptions {
                index,
                id: request.id.clone(),
                reason,
            };

            let options = parse_options(kind, request).map_err(malformed)?;
            let include = parse_include(kind, request).map_err(malformed)?;
            let capabilities = parse_capabilities(kind, request).map_err(malformed)?;

            if let Some(previous) = plugins.iter().find(|p| p.kind() == kind) {
                return Err(PluginResolutionError::CapabilityConflict {
                    index,
                    id: request.id.clone(),
                    previous_index: previous.precedence,
                    previous_id: previous.id.clone(),
                    kind,
                });
            }

            if let Some(capability) = mode.required_capabilities().missing_from(capabilities).next() {
                return Err(PluginResolutionError::MissingCapability {
                    index,
                    id: request.id.clone(),
                    capability,
                    mode,
                });
            }

            tracing::debug!(
                index,
                id = %request.id,
                kind = %kind,
                include = include.as_str(),
                "Plugin resolved"
            );

            plugins.push(ResolvedPlugin {
                id: request.id.clone(),
                precedence: index,
                options,
                include,
                capabilities,
            });
        }

        Ok(PluginSet { plugins })
    }
}

fn parse_options(kind: PluginKind, request: &PluginRequest) -> Result<PluginOptions, String> {
    for key in request.options.keys() {
        if key != "include" && !kind.option_keys().contains(&key.as_str()) {
            return Err(format!("unknown option `{key}` for {kind}"));
        }
    }

    let options = match kind {
        PluginKind::UiFrameworkTransform => {
            let runtime = match request.options.get("runtime") {
                Some(value) => expect_str(value, "runtime")?.parse()?,
                None => RuntimeMode::default(),
            };
            PluginOptions::UiFrameworkTransform { runtime }
        }
        PluginKind::CompilerTransform => {
            let extension = match request.options.get("extension") {
                Some(value) => expect_str(value, "extension")?.trim_start_matches('.').to_string(),
                None => "js".to_string(),
            };
            if extension.is_empty() {
                return Err("extension must not be empty".to_string());
            }
            PluginOptions::CompilerTransform { extension }
        }
        PluginKind::CssUtilityTransform => {
            let content = match request.options.get("content") {
                Some(toml::Value::Array(items)) => items
                    .iter()
                    .map(|item| expect_str(item, "content").map(str::to_string))
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err("content must be an array of strings".to_string()),
                None => Vec::new(),
            };
            if content.iter().any(|glob| glob.trim().is_empty()) {
                return Err("content entries must not be empty".to_string());
            }
            PluginOptions::CssUtilityTransform { content }
        }
    };

    Ok(options)
}

fn parse_include(kind: PluginKind, request: &PluginRequest) -> Result<IncludePattern, String> {
    let pattern = match request.options.get("include") {
        Some(value) => expect_str(value, "include")?,
        None => kind.default_include(),
    };
    IncludePattern::new(pattern).map_err(|e| format!("include pattern `{pattern}` is invalid: {e}"))
}

fn parse_capabilities(kind: PluginKind, request: &PluginRequest) -> Result<CapabilitySet, String> {
    let Some(requested) = &request.capabilities else {
        return Ok(kind.capabilities());
    };

    let mut set = CapabilitySet::empty();
    for name in requested {
        let capability: Capability = name.parse()?;
        if !kind.capabilities().contains(capability) {
            return Err(format!("{kind} cannot provide {capability}"));
        }
        set = set.with(capability);
    }
    Ok(set)
}

fn expect_str<'a>(value: &'a toml::Value, key: &str) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{key} must be a string, got {}", value.type_str()))
}
