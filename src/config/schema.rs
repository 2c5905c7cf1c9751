//! Configuration schema definitions.
//!
//! This module defines the on-disk structure of an entry-point configuration
//! file (`viaduct.toml`) and of the shared fragment it may include.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default file name looked up when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "viaduct.toml";

/// Root configuration of one entry point.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Project root, relative to the directory holding this file.
    /// Defaults to that directory.
    pub root: Option<PathBuf>,

    /// Shared fragment to merge under this file, relative to this file.
    pub include: Option<PathBuf>,

    /// Directory the build is allowed to write under, relative to this file.
    pub workspace_root: Option<PathBuf>,

    /// Ordered plugin activation requests. Order is precedence.
    pub plugins: Vec<PluginRequest>,

    /// Proxy rules applied by the dev server.
    pub proxy: Vec<ProxyRuleConfig>,

    /// Output directory request. Falls back to the fragment, then to `dist`.
    pub output: Option<OutputConfig>,

    /// Dev server settings.
    pub server: DevServerOptions,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// A single plugin activation request.
///
/// Every key other than `id` and `capabilities` is collected into `options`
/// and checked against the option schema of the plugin kind at composition.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PluginRequest {
    /// Registry id (e.g. "react", "fable", "tailwind").
    pub id: String,

    /// Optional narrowing of the capabilities this activation contributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,

    /// Kind-specific activation options.
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}

impl PluginRequest {
    /// Create a request with no options.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: None,
            options: BTreeMap::new(),
        }
    }

    /// Add an activation option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Restrict the capabilities this activation contributes.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(capabilities.into_iter().map(Into::into).collect());
        self
    }
}

/// Proxy rule as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyRuleConfig {
    /// URL path prefix (e.g. "/api").
    pub prefix: String,

    /// Upstream origin (e.g. "http://localhost:5000").
    pub target: String,

    /// Rewrite Host/Origin to the target origin.
    #[serde(default, alias = "change_origin")]
    pub rewrite_origin: bool,
}

impl ProxyRuleConfig {
    pub fn new(prefix: impl Into<String>, target: impl Into<String>, rewrite_origin: bool) -> Self {
        Self {
            prefix: prefix.into(),
            target: target.into(),
            rewrite_origin,
        }
    }
}

/// Output directory request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, relative to the project root.
    pub dir: PathBuf,

    /// Remove previous contents before writing. Destructive; off unless set.
    #[serde(alias = "empty_out_dir")]
    pub clean: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            clean: false,
        }
    }
}

/// Dev server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DevServerOptions {
    /// Interface to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Open a browser once listening.
    pub open: bool,

    /// Fail instead of trying the next port when `port` is taken.
    pub strict_port: bool,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DevServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5173,
            open: false,
            strict_port: false,
            request_timeout_secs: 30,
        }
    }
}

impl DevServerOptions {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert!(config.root.is_none());
        assert!(config.plugins.is_empty());
        assert_eq!(config.server.port, 5173);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_plugin_options_are_flattened() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [[plugins]]
            id = "react"
            runtime = "classic"
            include = '\.(jsx|js)$'
            "#,
        )
        .unwrap();

        let plugin = &config.plugins[0];
        assert_eq!(plugin.id, "react");
        assert_eq!(plugin.options.len(), 2);
        assert_eq!(plugin.options["runtime"].as_str(), Some("classic"));
    }

    #[test]
    fn test_change_origin_alias() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [[proxy]]
            prefix = "/api"
            target = "http://localhost:5000"
            change_origin = true
            "#,
        )
        .unwrap();
        assert!(config.proxy[0].rewrite_origin);
    }

    #[test]
    fn test_output_clean_defaults_off() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [output]
            dir = "../../deploy/public"
            "#,
        )
        .unwrap();
        let output = config.output.unwrap();
        assert_eq!(output.dir, PathBuf::from("../../deploy/public"));
        assert!(!output.clean);
    }
}
