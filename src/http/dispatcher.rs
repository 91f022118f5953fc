//! Inbound request dispatch.
//!
//! # Responsibilities
//! - Look up the route for every inbound request
//! - Forward matched requests; answer failures with a gateway error
//! - Hand unmatched requests to the static fallback
//!
//! # Design Decisions
//! - "No route" is a normal outcome handled only here
//! - The forwarder is never invoked for unmatched paths

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::http::forward::Forwarder;
use crate::http::static_files::StaticFallback;
use crate::routing::RouteTable;

/// Entry point for every inbound request.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    forwarder: Forwarder,
    fallback: StaticFallback,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, forwarder: Forwarder, fallback: StaticFallback) -> Self {
        Self {
            routes: Arc::new(routes),
            forwarder,
            fallback,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn handle(&self, request: Request<Body>) -> Response {
        let Some(route) = self.routes.match_path(request.uri().path()) else {
            tracing::debug!(path = %request.uri().path(), "No route matched; using static fallback");
            return self.fallback.serve(request).await;
        };

        match self.forwarder.forward(request, route).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}
