//! HTTP dev server subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → routing::ProxyTable::resolve
//!         → match: forward.rs (URI + header rewrite) → upstream backend
//!         → no match, claimed by a plugin: assets.rs (Transformer)
//!         → otherwise: project files (ServeDir)
//!     → Send to client
//! ```

pub mod assets;
pub mod forward;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{DevServer, SharedConfig};
