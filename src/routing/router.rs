//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Longest prefix wins; equal lengths keep configuration order

use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::routing::route::{Origin, OriginError, Route};

/// Ordered, read-only table of forwarding rules.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        }
    }

    /// Compile the configured routes, resolving each target origin.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, OriginError> {
        let default_target = Origin::parse(&config.upstream.target)?;

        let routes = config
            .routes
            .iter()
            .map(|rc| {
                let target = match &rc.target {
                    Some(url) => Origin::parse(url)?,
                    None => default_target.clone(),
                };
                Ok(Route::new(
                    rc.name.clone(),
                    rc.path_prefix.clone(),
                    target,
                    rc.supports_upgrade,
                    rc.origin_rewrite,
                ))
            })
            .collect::<Result<Vec<_>, OriginError>>()?;

        Ok(Self::new(routes))
    }

    /// Find the route responsible for `path`, if any.
    pub fn match_path(&self, path: &str) -> Option<Arc<Route>> {
        let mut best: Option<&Arc<Route>> = None;
        for route in self.routes.iter().filter(|r| r.matches(path)) {
            match best {
                Some(current) if current.path_prefix().len() >= route.path_prefix().len() => {}
                _ => best = Some(route),
            }
        }
        best.cloned()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
