//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and required strings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PipelineConfig → Result<(), Vec<ValidationError>>
//! - Plugin options, proxy prefixes and output paths are checked at
//!   composition, where the error taxonomy names the offending item

use thiserror::Error;

use crate::config::schema::PipelineConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("plugins[{index}]: id must not be empty")]
    EmptyPluginId { index: usize },

    #[error("proxy[{index}]: {field} must not be empty")]
    EmptyProxyField { index: usize, field: &'static str },

    #[error("output.dir must not be empty")]
    EmptyOutputDir,

    #[error("server.host must not be empty")]
    EmptyHost,

    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("logging.level `{0}` is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),
}

/// Validate a parsed configuration (after fragment merge).
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, plugin) in config.plugins.iter().enumerate() {
        if plugin.id.trim().is_empty() {
            errors.push(ValidationError::EmptyPluginId { index });
        }
    }

    for (index, rule) in config.proxy.iter().enumerate() {
        if rule.prefix.is_empty() {
            errors.push(ValidationError::EmptyProxyField { index, field: "prefix" });
        }
        if rule.target.is_empty() {
            errors.push(ValidationError::EmptyProxyField { index, field: "target" });
        }
    }

    if let Some(output) = &config.output {
        if output.dir.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyOutputDir);
        }
    }

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{OutputConfig, PluginRequest, ProxyRuleConfig};
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PipelineConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = PipelineConfig::default();
        config.plugins.push(PluginRequest::new(" "));
        config.proxy.push(ProxyRuleConfig::new("", "", false));
        config.output = Some(OutputConfig {
            dir: PathBuf::new(),
            clean: false,
        });
        config.server.request_timeout_secs = 0;
        config.logging.level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::EmptyPluginId { index: 0 }));
        assert!(errors.contains(&ValidationError::EmptyProxyField { index: 0, field: "target" }));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".into())));
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = PipelineConfig::default();
        config.logging.level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }
}
