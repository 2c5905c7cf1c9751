//! Proxy routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming dev-server request (path)
//!     → router.rs (rule lookup)
//!     → matcher.rs (literal prefix test)
//!     → Return: matched ProxyRule or None (serve assets)
//!
//! Table Compilation (at composition):
//!     ProxyRuleConfig[]
//!     → Reject duplicate / unrooted prefixes, bad targets
//!     → Sort by prefix length, longest first
//!     → Freeze as immutable ProxyTable
//! ```
//!
//! # Design Decisions
//! - Table compiled at composition, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same rule
//! - Longest prefix wins; duplicates never reach the table

pub mod matcher;
pub mod router;

pub use router::{ProxyRule, ProxyRuleConflictError, ProxyRuleError, ProxyTable};
