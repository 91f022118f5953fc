//! Exchange state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique exchange IDs for tracing
//! - Track exchange state (Pending → Connected → Streaming/Completed → Closed)
//! - Emit lifecycle events to the injected observer
//! - Record early release when the caller goes away

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::http::ForwardError;
use crate::observability::{notify, ExchangeObserver, ObserverEvent};
use crate::routing::Route;

/// Global atomic counter for exchange IDs.
static EXCHANGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(u64);

impl ExchangeId {
    /// Generate a new unique exchange ID.
    pub fn new() -> Self {
        Self(EXCHANGE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exchange-{}", self.0)
    }
}

/// Exchange state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Request accepted, no upstream response yet.
    Pending,
    /// Upstream response head received.
    Connected,
    /// Upgraded; bytes are being relayed.
    Streaming,
    /// Plain response handed back to the caller.
    Completed,
    /// Connection(s) released.
    Closed,
    /// Upstream failed.
    Failed,
}

impl ExchangeState {
    /// Whether moving to `next` keeps the lifecycle monotonic.
    pub fn can_advance_to(self, next: ExchangeState) -> bool {
        use ExchangeState::*;
        matches!(
            (self, next),
            (Pending, Connected)
                | (Pending, Failed)
                | (Connected, Streaming)
                | (Connected, Completed)
                | (Connected, Failed)
                | (Streaming, Closed)
                | (Streaming, Failed)
                | (Completed, Closed)
                | (Failed, Closed)
        )
    }
}

/// One forwarded request or upgraded connection.
///
/// Created by the forwarder. A plain exchange then moves into the response
/// body, an upgraded one into its relay task; dropping it marks the end of its
/// lifetime.
pub struct Exchange {
    id: ExchangeId,
    route: Arc<Route>,
    method: Method,
    url: String,
    state: ExchangeState,
    observer: Arc<dyn ExchangeObserver>,
}

impl Exchange {
    pub fn new(
        route: Arc<Route>,
        method: Method,
        url: impl Into<String>,
        observer: Arc<dyn ExchangeObserver>,
    ) -> Self {
        let exchange = Self {
            id: ExchangeId::new(),
            route,
            method,
            url: url.into(),
            state: ExchangeState::Pending,
            observer,
        };
        tracing::trace!(
            exchange = %exchange.id,
            route = %exchange.route.name,
            url = %exchange.url,
            "Exchange opened"
        );
        exchange
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Move to `next` if the transition is legal. Returns whether it moved.
    pub fn advance(&mut self, next: ExchangeState) -> bool {
        if !self.state.can_advance_to(next) {
            tracing::warn!(
                exchange = %self.id,
                from = ?self.state,
                to = ?next,
                "Refusing non-monotonic exchange transition"
            );
            return false;
        }
        tracing::trace!(exchange = %self.id, from = ?self.state, to = ?next, "Exchange transition");
        self.state = next;
        true
    }

    /// Emit `RequestSent`; call immediately before the upstream send.
    pub fn request_sent(&self) {
        self.emit(ObserverEvent::RequestSent {
            method: &self.method,
            url: &self.url,
        });
    }

    /// Record the arrival of the upstream response head.
    pub fn response_received(&mut self, status: StatusCode) {
        if self.advance(ExchangeState::Connected) {
            self.emit(ObserverEvent::ResponseReceived {
                status,
                url: &self.url,
            });
        }
    }

    /// Record an upstream failure. Reported once; later calls are ignored.
    pub fn fail(&mut self, error: &ForwardError) {
        if self.advance(ExchangeState::Failed) {
            self.emit(ObserverEvent::Error(error));
        }
    }

    fn emit(&self, event: ObserverEvent<'_>) {
        notify(self.observer.as_ref(), &self.route, event);
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("id", &self.id)
            .field("route", &self.route.name)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        match self.state {
            ExchangeState::Pending | ExchangeState::Connected => {
                // Caller disconnected mid-exchange; the upstream request is
                // dropped along with this handler.
                tracing::debug!(
                    exchange = %self.id,
                    route = %self.route.name,
                    url = %self.url,
                    "Caller went away before the exchange finished; upstream released"
                );
            }
            ExchangeState::Streaming | ExchangeState::Completed | ExchangeState::Failed => {
                self.state = ExchangeState::Closed;
            }
            ExchangeState::Closed => {}
        }
        tracing::trace!(exchange = %self.id, state = ?self.state, "Exchange closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Origin;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ExchangeObserver for Recorder {
        fn on_request_sent(&self, _route: &Route, method: &Method, url: &str) {
            self.0.lock().unwrap().push(format!("sent {method} {url}"));
        }

        fn on_response_received(&self, _route: &Route, status: StatusCode, url: &str) {
            self.0.lock().unwrap().push(format!("received {} {url}", status.as_u16()));
        }

        fn on_error(&self, _route: &Route, error: &ForwardError) {
            self.0.lock().unwrap().push(format!("error {}", error.kind()));
        }
    }

    fn exchange(recorder: Arc<Recorder>) -> Exchange {
        let route = Route::new(
            "list_indexes",
            "/list_indexes",
            Origin::parse("http://localhost:8080").unwrap(),
            false,
            true,
        );
        Exchange::new(Arc::new(route), Method::GET, "/list_indexes", recorder)
    }

    fn unreachable() -> ForwardError {
        ForwardError::UpstreamUnreachable {
            origin: "http://localhost:8080".into(),
            source: "connection refused".into(),
        }
    }

    #[test]
    fn exchange_id_unique() {
        let id1 = ExchangeId::new();
        let id2 = ExchangeId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn transitions_are_monotonic() {
        use ExchangeState::*;
        assert!(Pending.can_advance_to(Connected));
        assert!(Connected.can_advance_to(Streaming));
        assert!(Connected.can_advance_to(Completed));
        assert!(Completed.can_advance_to(Closed));
        assert!(Streaming.can_advance_to(Failed));

        assert!(!Connected.can_advance_to(Pending));
        assert!(!Completed.can_advance_to(Streaming));
        assert!(!Closed.can_advance_to(Pending));
        assert!(!Failed.can_advance_to(Connected));
        assert!(!Pending.can_advance_to(Completed));
    }

    #[test]
    fn successful_exchange_emits_sent_then_received() {
        let recorder = Arc::new(Recorder::default());
        let mut exchange = exchange(recorder.clone());

        exchange.request_sent();
        exchange.response_received(StatusCode::OK);
        assert!(exchange.advance(ExchangeState::Completed));
        drop(exchange);

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["sent GET /list_indexes", "received 200 /list_indexes"]
        );
    }

    #[test]
    fn failure_is_reported_once_and_excludes_response() {
        let recorder = Arc::new(Recorder::default());
        let mut exchange = exchange(recorder.clone());

        exchange.request_sent();
        exchange.fail(&unreachable());
        exchange.fail(&unreachable());
        exchange.response_received(StatusCode::OK);

        assert_eq!(exchange.state(), ExchangeState::Failed);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["sent GET /list_indexes", "error upstream_unreachable"]
        );
    }
}
