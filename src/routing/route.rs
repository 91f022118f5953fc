//! Route and origin types.
//!
//! An [`Origin`] is parsed once at startup so that a malformed target is a
//! configuration error, never a per-request failure.

use std::fmt;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;
use thiserror::Error;
use url::Url;

use crate::routing::matcher::PathPrefixMatcher;

/// Error produced when a target URL is not a usable origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("`{url}` is not a valid URL: {reason}")]
    Malformed { url: String, reason: String },

    #[error("`{url}` uses unsupported scheme `{scheme}`: only http targets are supported, upstream TLS is not")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("`{0}` has no host")]
    MissingHost(String),

    #[error("`{0}` must not carry a path, query or fragment")]
    NotAnOrigin(String),
}

/// A network target identified by host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: Scheme,
    authority: Authority,
}

impl Origin {
    /// Parse an origin such as `http://localhost:8080`.
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let url = Url::parse(input).map_err(|e| OriginError::Malformed {
            url: input.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" {
            return Err(OriginError::UnsupportedScheme {
                url: input.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| OriginError::MissingHost(input.to_string()))?;

        if !matches!(url.path(), "" | "/")
            || url.query().is_some()
            || url.fragment().is_some()
            || !url.username().is_empty()
        {
            return Err(OriginError::NotAnOrigin(input.to_string()));
        }

        // Default ports are dropped by `url`, matching what a browser would
        // send in `Host`.
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = authority.parse::<Authority>().map_err(|e| OriginError::Malformed {
            url: input.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
        })
    }

    /// `host[:port]`, the value presented as `Host` when rewriting.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute URI on this origin for an inbound path and query.
    pub fn uri_for(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query.map(PathAndQuery::as_str).unwrap_or("/"))
            .build()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// A compiled forwarding rule. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route identifier for logging/metrics.
    pub name: String,
    /// Where matching requests are forwarded.
    pub target: Origin,
    /// Whether WebSocket handshakes are relayed on this route.
    pub supports_upgrade: bool,
    /// Present the target's authority as `Host` upstream.
    pub origin_rewrite: bool,
    matcher: PathPrefixMatcher,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        path_prefix: impl Into<String>,
        target: Origin,
        supports_upgrade: bool,
        origin_rewrite: bool,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            supports_upgrade,
            origin_rewrite,
            matcher: PathPrefixMatcher::new(path_prefix),
        }
    }

    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}
