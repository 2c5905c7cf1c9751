//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!
//! Consumers:
//!     → stderr (fmt layer)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`root`, `prefix`, `request_id`) over formatted strings
//! - Request ID flows from the HTTP layer into proxy logs

pub mod logging;

pub use logging::init_logging;
