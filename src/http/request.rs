//! Request handling and transformation.
//!
//! # Responsibilities
//! - Re-target the inbound request at the route's origin
//! - Rewrite `Host` when the route asks for it
//! - Leave method, headers and body untouched otherwise
//!
//! # Design Decisions
//! - The body is streamed through, never buffered
//! - Outbound is always HTTP/1.1 so upgrade handshakes survive

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Version};

use crate::routing::Route;

/// Path and query of the inbound request, as shown in diagnostics.
pub fn display_url<B>(request: &Request<B>) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Turn an inbound request into the one sent to `route.target`.
pub fn outbound_request(request: Request<Body>, route: &Route) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    parts.uri = route.target.uri_for(parts.uri.path_and_query())?;
    parts.version = Version::HTTP_11;
    // Server-side extensions (connect info, pending upgrades) stay inbound.
    parts.extensions.clear();

    if route.origin_rewrite {
        let host = HeaderValue::from_str(route.target.authority().as_str())?;
        parts.headers.insert(header::HOST, host);
    }

    Ok(Request::from_parts(parts, body))
}
