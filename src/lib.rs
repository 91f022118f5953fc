//! Development reverse proxy.
//!
//! Serves a frontend's unmatched paths from disk and forwards a fixed set of
//! backend paths, including WebSocket upgrades, to a single upstream origin.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
