//! Plugin kinds, capabilities and per-kind options.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Closed set of plugin kinds the pipeline knows how to wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    /// UI framework preprocessor (JSX and friends).
    UiFrameworkTransform,
    /// Non-JS source language to JS module compiler.
    CompilerTransform,
    /// Utility-class CSS generator.
    CssUtilityTransform,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::UiFrameworkTransform => "ui-framework-transform",
            PluginKind::CompilerTransform => "compiler-transform",
            PluginKind::CssUtilityTransform => "css-utility-transform",
        }
    }

    /// Everything a plugin of this kind is able to contribute.
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            PluginKind::UiFrameworkTransform => {
                CapabilitySet::of(&[Capability::SourceTransform, Capability::DevMiddleware])
            }
            PluginKind::CompilerTransform => CapabilitySet::all(),
            PluginKind::CssUtilityTransform => {
                CapabilitySet::of(&[Capability::AssetEmit, Capability::DevMiddleware])
            }
        }
    }

    /// Include pattern used when a request does not set one.
    pub fn default_include(&self) -> &'static str {
        match self {
            PluginKind::UiFrameworkTransform => r"\.(jsx|js)$",
            PluginKind::CompilerTransform => r"\.fs$",
            PluginKind::CssUtilityTransform => r"\.css$",
        }
    }

    /// Option keys accepted by this kind besides `include`.
    pub fn option_keys(&self) -> &'static [&'static str] {
        match self {
            PluginKind::UiFrameworkTransform => &["runtime"],
            PluginKind::CompilerTransform => &["extension"],
            PluginKind::CssUtilityTransform => &["content"],
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a plugin contributes to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    SourceTransform,
    AssetEmit,
    DevMiddleware,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::SourceTransform,
        Capability::AssetEmit,
        Capability::DevMiddleware,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SourceTransform => "source-transform",
            Capability::AssetEmit => "asset-emit",
            Capability::DevMiddleware => "dev-middleware",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Capability::SourceTransform => 0b001,
            Capability::AssetEmit => 0b010,
            Capability::DevMiddleware => 0b100,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability `{s}`"))
    }
}

/// Small bit set of capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::of(&Capability::ALL)
    }

    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities.iter().fold(Self::empty(), |set, c| set.with(*c))
    }

    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_subset_of(&self, other: CapabilitySet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Capabilities in `self` that `other` lacks.
    pub fn missing_from(&self, other: CapabilitySet) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(move |c| self.contains(*c) && !other.contains(*c))
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Pipeline mode a configuration is composed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Dev,
    Build,
}

impl Mode {
    /// Capabilities every plugin must provide in this mode.
    pub fn required_capabilities(&self) -> CapabilitySet {
        match self {
            Mode::Dev => CapabilitySet::of(&[Capability::DevMiddleware]),
            Mode::Build => CapabilitySet::empty(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Dev => "dev",
            Mode::Build => "build",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" | "development" | "serve" => Ok(Mode::Dev),
            "build" | "production" => Ok(Mode::Build),
            other => Err(format!("unknown mode `{other}` (expected dev or build)")),
        }
    }
}

/// How emitted code references the UI framework runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Classic,
    #[default]
    Automatic,
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(RuntimeMode::Classic),
            "automatic" => Ok(RuntimeMode::Automatic),
            other => Err(format!("runtime must be \"classic\" or \"automatic\", got `{other}`")),
        }
    }
}

/// Validated per-kind options. The variant fixes the plugin kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PluginOptions {
    UiFrameworkTransform { runtime: RuntimeMode },
    CompilerTransform { extension: String },
    CssUtilityTransform { content: Vec<String> },
}

impl PluginOptions {
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginOptions::UiFrameworkTransform { .. } => PluginKind::UiFrameworkTransform,
            PluginOptions::CompilerTransform { .. } => PluginKind::CompilerTransform,
            PluginOptions::CssUtilityTransform { .. } => PluginKind::CssUtilityTransform,
        }
    }
}
