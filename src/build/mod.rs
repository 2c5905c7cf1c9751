//! Build pass subsystem.
//!
//! # Data Flow
//! ```text
//! BuildConfiguration
//!     → engine.rs (clean policy, walk project root)
//!     → PluginSet::claim (first matching plugin)
//!     → transform.rs (Transformer collaborator)
//!     → files written under OutputTarget
//! ```

pub mod engine;
pub mod transform;

pub use engine::{BuildEngine, BuildError, BuildReport};
pub use transform::{emitted_path, CopyTransformer, Emitted, SourceFile, TransformError, Transformer};
