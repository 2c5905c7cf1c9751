//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! viaduct.toml
//!     → loader.rs (parse & deserialize)
//!     → fragment.rs (merge the shared fragment it includes)
//!     → validation.rs (semantic checks)
//!     → EntryConfig (absolute base dir + workspace root)
//!     → compose (BuildConfiguration, immutable)
//!
//! On change (dev mode):
//!     watcher.rs detects change
//!     → recompose from disk
//!     → atomic swap of Arc<BuildConfiguration>
//!     → dev server observes new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once composed; changes require full recomposition
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod fragment;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError, EntryConfig};
pub use schema::{DevServerOptions, OutputConfig, PipelineConfig, PluginRequest, ProxyRuleConfig};
