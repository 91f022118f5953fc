//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse every target origin so bad addresses fail at startup
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::routing::{Origin, OriginError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("upstream.target: {0}")]
    InvalidTarget(OriginError),

    #[error("route `{route}` target: {source}")]
    InvalidRouteTarget { route: String, source: OriginError },

    #[error("route `{route}` path prefix `{prefix}` must start with '/'")]
    InvalidPathPrefix { route: String, prefix: String },

    #[error("route name `{0}` is defined more than once")]
    DuplicateRouteName(String),

    #[error("path prefix `{0}` is claimed by more than one route")]
    DuplicatePathPrefix(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(e) = Origin::parse(&config.upstream.target) {
        errors.push(ValidationError::InvalidTarget(e));
    }

    let mut names = HashSet::new();
    let mut prefixes = HashSet::new();
    for route in &config.routes {
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPathPrefix {
                route: route.name.clone(),
                prefix: route.path_prefix.clone(),
            });
        }
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }
        if !prefixes.insert(route.path_prefix.as_str()) {
            errors.push(ValidationError::DuplicatePathPrefix(route.path_prefix.clone()));
        }
        if let Some(target) = &route.target {
            if let Err(source) = Origin::parse(target) {
                errors.push(ValidationError::InvalidRouteTarget {
                    route: route.name.clone(),
                    source,
                });
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "localhost".into();
        config.upstream.target = "http://localhost:8080/api".into();
        config.routes.push(RouteConfig::new("chat", "chat", true));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::InvalidBindAddress(_)));
        assert!(matches!(
            errors[1],
            ValidationError::InvalidTarget(OriginError::NotAnOrigin(_))
        ));
        assert!(errors.contains(&ValidationError::InvalidPathPrefix {
            route: "chat".into(),
            prefix: "chat".into(),
        }));
        assert!(errors.contains(&ValidationError::DuplicateRouteName("chat".into())));
    }

    #[test]
    fn duplicate_prefixes_are_rejected() {
        let mut config = ProxyConfig::default();
        config.routes.push(RouteConfig::new("chat-again", "/chat", true));
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::DuplicatePathPrefix("/chat".into())])
        );
    }

    #[test]
    fn bad_route_target_is_reported_by_name() {
        let mut config = ProxyConfig::default();
        config.routes[1].target = Some("https://localhost:8443".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidRouteTarget { route, .. } if route == "fetch"
        ));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("nowhere".into())])
        );
    }
}
