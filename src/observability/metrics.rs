//! Metrics collection and exposition.
//!
//! # Metrics
//! - `devproxy_requests_sent_total` (counter): requests sent upstream, by route
//! - `devproxy_responses_total` (counter): upstream responses, by route and status
//! - `devproxy_upstream_errors_total` (counter): failed exchanges, by route and kind
//!
//! Without an installed recorder the macros are no-ops, so the observer is
//! always safe to attach.

use std::net::SocketAddr;

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::ForwardError;
use crate::observability::observer::ExchangeObserver;
use crate::routing::Route;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!("devproxy_requests_sent_total", "Requests sent to the upstream");
    metrics::describe_counter!("devproxy_responses_total", "Response heads received from the upstream");
    metrics::describe_counter!("devproxy_upstream_errors_total", "Exchanges that failed upstream");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Counts lifecycle events per route.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl ExchangeObserver for MetricsObserver {
    fn on_request_sent(&self, route: &Route, _method: &Method, _url: &str) {
        metrics::counter!("devproxy_requests_sent_total", "route" => route.name.clone()).increment(1);
    }

    fn on_response_received(&self, route: &Route, status: StatusCode, _url: &str) {
        metrics::counter!(
            "devproxy_responses_total",
            "route" => route.name.clone(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
    }

    fn on_error(&self, route: &Route, error: &ForwardError) {
        metrics::counter!(
            "devproxy_upstream_errors_total",
            "route" => route.name.clone(),
            "kind" => error.kind()
        )
        .increment(1);
    }
}
