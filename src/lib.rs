//! Build and dev-server configuration composer.
//!
//! Resolves plugin activations, proxy rules and the output directory of an
//! entry point into one immutable [`BuildConfiguration`], then drives either
//! a build pass or a proxying dev server from it.

pub mod build;
pub mod compose;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod output;
pub mod plugins;
pub mod routing;

pub use compose::{BuildConfiguration, Composer};
pub use config::schema::PipelineConfig;
pub use http::DevServer;
pub use lifecycle::Shutdown;
pub use plugins::Mode;
