//! Exchange lifecycle hooks.
//!
//! # Responsibilities
//! - Define the callback slots invoked around every forwarded exchange
//! - Provide the default log-line implementation
//! - Shield forwarding from misbehaving hooks
//!
//! # Design Decisions
//! - Hooks are synchronous and diagnostic-only; they receive borrowed data
//!   and cannot influence the outcome
//! - Observers are injected into the server, never reached through globals
//! - A panicking hook is caught and logged, and forwarding continues

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::http::ForwardError;
use crate::routing::Route;

/// Callback slots invoked at fixed points of an exchange.
///
/// For one exchange `on_request_sent` is always first, followed by at most
/// one of `on_response_received` or `on_error`.
pub trait ExchangeObserver: Send + Sync {
    /// Called immediately before the request is sent upstream.
    fn on_request_sent(&self, _route: &Route, _method: &Method, _url: &str) {}

    /// Called as soon as the upstream response head has arrived.
    fn on_response_received(&self, _route: &Route, _status: StatusCode, _url: &str) {}

    /// Called once when the upstream could not produce a response.
    fn on_error(&self, _route: &Route, _error: &ForwardError) {}
}

/// A lifecycle event, as emitted by an exchange.
#[derive(Debug, Clone, Copy)]
pub enum ObserverEvent<'a> {
    RequestSent { method: &'a Method, url: &'a str },
    ResponseReceived { status: StatusCode, url: &'a str },
    Error(&'a ForwardError),
}

impl ObserverEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestSent { .. } => "request_sent",
            Self::ResponseReceived { .. } => "response_received",
            Self::Error(_) => "error",
        }
    }
}

/// Deliver `event` to the matching slot, containing any panic.
pub fn notify(observer: &dyn ExchangeObserver, route: &Route, event: ObserverEvent<'_>) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
        ObserverEvent::RequestSent { method, url } => observer.on_request_sent(route, method, url),
        ObserverEvent::ResponseReceived { status, url } => {
            observer.on_response_received(route, status, url)
        }
        ObserverEvent::Error(error) => observer.on_error(route, error),
    }));

    if outcome.is_err() {
        tracing::error!(
            route = %route.name,
            event = event.name(),
            "Exchange observer panicked; ignoring"
        );
    }
}

/// Writes one human-readable line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ExchangeObserver for LogObserver {
    fn on_request_sent(&self, route: &Route, method: &Method, url: &str) {
        tracing::info!(
            route = %route.name,
            target = %route.target,
            "Sending request to the target: {} {}",
            method,
            url
        );
    }

    fn on_response_received(&self, route: &Route, status: StatusCode, url: &str) {
        tracing::info!(
            route = %route.name,
            "Received response from the target: {} {}",
            status.as_u16(),
            url
        );
    }

    fn on_error(&self, route: &Route, error: &ForwardError) {
        tracing::error!(route = %route.name, kind = error.kind(), "proxy error: {}", error);
    }
}

/// Fans every event out to several observers, in order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn ExchangeObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn ExchangeObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ExchangeObserver for ObserverSet {
    fn on_request_sent(&self, route: &Route, method: &Method, url: &str) {
        for observer in &self.observers {
            notify(observer.as_ref(), route, ObserverEvent::RequestSent { method, url });
        }
    }

    fn on_response_received(&self, route: &Route, status: StatusCode, url: &str) {
        for observer in &self.observers {
            notify(observer.as_ref(), route, ObserverEvent::ResponseReceived { status, url });
        }
    }

    fn on_error(&self, route: &Route, error: &ForwardError) {
        for observer in &self.observers {
            notify(observer.as_ref(), route, ObserverEvent::Error(error));
        }
    }
}
