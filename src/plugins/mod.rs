//! Plugin registry subsystem.
//!
//! # Data Flow
//! ```text
//! PluginRequest[] (id + options, in precedence order)
//!     → registry.rs (id lookup, option schema per kind)
//!     → kind.rs (capabilities, mode requirements)
//!     → PluginSet (ordered, immutable)
//!
//! At build time:
//!     file path → PluginSet::claim → first plugin whose include matches
//! ```
//!
//! # Design Decisions
//! - Plugin kinds are a closed enum; options are validated, not duck-typed
//! - One plugin per kind; a second one is a capability conflict
//! - Overlapping include patterns are allowed, earlier plugin wins
//! - Fail on the first unresolvable plugin

pub mod kind;
pub mod registry;

pub use kind::{Capability, CapabilitySet, Mode, PluginKind, PluginOptions, RuntimeMode};
pub use registry::{IncludePattern, PluginRegistry, PluginResolutionError, PluginSet, ResolvedPlugin};
