//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Backend every default route forwards to.
pub const DEFAULT_TARGET: &str = "http://localhost:8080";

/// Root configuration for the development proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Default upstream origin for routes without their own target.
    pub upstream: UpstreamConfig,

    /// Route definitions, evaluated in order.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Static asset fallback for unmatched paths.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            routes: default_routes(),
            timeouts: TimeoutConfig::default(),
            static_files: StaticFilesConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:5173").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5173".to_string(),
        }
    }
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin URL (e.g., "http://localhost:8080").
    pub target: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
        }
    }
}

/// A single forwarding rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (case-sensitive).
    pub path_prefix: String,

    /// Per-route origin; falls back to `upstream.target`.
    #[serde(default)]
    pub target: Option<String>,

    /// Whether WebSocket handshakes on this route are relayed.
    #[serde(default, alias = "ws")]
    pub supports_upgrade: bool,

    /// Rewrite the `Host` header to the target's authority.
    #[serde(default = "default_origin_rewrite", alias = "change_origin")]
    pub origin_rewrite: bool,
}

impl RouteConfig {
    /// Route to the default upstream with `Host` rewriting enabled.
    pub fn new(name: impl Into<String>, path_prefix: impl Into<String>, supports_upgrade: bool) -> Self {
        Self {
            name: name.into(),
            path_prefix: path_prefix.into(),
            target: None,
            supports_upgrade,
            origin_rewrite: true,
        }
    }
}

fn default_origin_rewrite() -> bool {
    true
}

/// The frontend's backend routes.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("list_indexes", "/list_indexes", false),
        RouteConfig::new("fetch", "/fetch", false),
        RouteConfig::new("chat", "/chat", true),
        RouteConfig::new("generate", "/generate", true),
        RouteConfig::new("remove", "/remove", true),
    ]
}

/// Timeout configuration for upstream connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds (0 disables).
    pub connect_secs: u64,

    /// How long an upgraded relay keeps draining one direction after the
    /// other has closed, in seconds.
    pub close_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            close_grace_secs: 5,
        }
    }
}

/// Static asset fallback configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory with the built frontend. Unset means unmatched paths get 404.
    pub root: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_five_routes() {
        let config = ProxyConfig::default();
        let prefixes: Vec<_> = config.routes.iter().map(|r| r.path_prefix.as_str()).collect();
        assert_eq!(prefixes, ["/list_indexes", "/fetch", "/chat", "/generate", "/remove"]);

        let upgradable: Vec<_> = config
            .routes
            .iter()
            .filter(|r| r.supports_upgrade)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(upgradable, ["chat", "generate", "remove"]);
        assert!(config.routes.iter().all(|r| r.origin_rewrite && r.target.is_none()));
    }
}
