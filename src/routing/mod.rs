//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate prefix)
//!     → Return: matched Route or None (static fallback)
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → route.rs (parse target origins)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - A miss is a normal outcome, not an error

pub mod matcher;
pub mod route;
pub mod router;

pub use route::{Origin, OriginError, Route};
pub use router::RouteTable;
