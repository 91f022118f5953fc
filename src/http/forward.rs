//! Upstream forwarding.
//!
//! # Responsibilities
//! - Replay a matched request against the route's origin
//! - Emit lifecycle events around the upstream call
//! - Switch to a raw byte relay for accepted WebSocket handshakes
//!
//! # Design Decisions
//! - One fresh upstream connection per exchange (no idle pooling), closed on
//!   every exit path by dropping it
//! - A plain exchange rides along with its response body and closes when the
//!   body has been streamed or dropped
//! - No retries: a failed forward is reported once and surfaced to the caller
//! - Upgrade mode is decided per request, so one route serves both plain
//!   HTTP and WebSocket traffic

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::exchange::{Exchange, ExchangeState};
use crate::http::request::{display_url, outbound_request};
use crate::http::response::{relay_response, ExchangeBody};
use crate::http::websocket::{is_upgrade_request, spawn_relay};
use crate::http::ForwardError;
use crate::observability::ExchangeObserver;
use crate::routing::Route;

/// Sends matched requests upstream and relays the result.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    observer: Arc<dyn ExchangeObserver>,
    close_grace: Duration,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig, observer: Arc<dyn ExchangeObserver>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_connect_timeout(
            (timeouts.connect_secs > 0).then(|| Duration::from_secs(timeouts.connect_secs)),
        );

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        Self {
            client,
            observer,
            close_grace: Duration::from_secs(timeouts.close_grace_secs),
        }
    }

    /// Forward one request on `route` and return the caller's response.
    pub async fn forward(
        &self,
        mut request: Request<Body>,
        route: Arc<Route>,
    ) -> Result<Response<Body>, ForwardError> {
        let mut exchange = Exchange::new(
            route.clone(),
            request.method().clone(),
            display_url(&request),
            self.observer.clone(),
        );

        let caller_upgrade = (route.supports_upgrade && is_upgrade_request(request.headers()))
            .then(|| hyper::upgrade::on(&mut request));

        let outbound = match outbound_request(request, &route) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(exchange = %exchange.id(), route = %route.name, error = %e, "Request cannot be forwarded");
                // Nothing was sent, so observers hear nothing.
                exchange.advance(ExchangeState::Failed);
                return Err(ForwardError::InvalidRequest(e));
            }
        };

        exchange.request_sent();

        let mut response = match self.client.request(outbound).await {
            Ok(response) => response,
            Err(e) => {
                let err = ForwardError::from_client(e, &route.target);
                exchange.fail(&err);
                return Err(err);
            }
        };

        let status = response.status();
        exchange.response_received(status);

        match caller_upgrade {
            Some(caller_upgrade) if status == StatusCode::SWITCHING_PROTOCOLS => {
                let upstream_upgrade = hyper::upgrade::on(&mut response);
                exchange.advance(ExchangeState::Streaming);
                spawn_relay(exchange, caller_upgrade, upstream_upgrade, self.close_grace);
                Ok(relay_response(response))
            }
            _ => {
                exchange.advance(ExchangeState::Completed);
                Ok(relay_response(
                    response.map(|body| ExchangeBody::new(body, exchange)),
                ))
            }
        }
    }
}
