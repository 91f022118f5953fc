//! Response handling and transformation.
//!
//! # Responsibilities
//! - Hand the upstream response back to the caller unchanged
//! - Map forwarding errors to gateway-failure responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Every upstream failure becomes a terminal response, never a hang

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Response;
use axum::response::IntoResponse;
use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};

use crate::http::exchange::Exchange;
use crate::http::ForwardError;

/// Re-wrap an upstream response for the caller, keeping status, headers and
/// body stream as received.
pub fn relay_response<B>(response: Response<B>) -> Response<Body>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<axum::BoxError>,
{
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

/// Response body that keeps its [`Exchange`] alive until the last frame has
/// been streamed to the caller.
pub struct ExchangeBody<B> {
    inner: B,
    exchange: Option<Exchange>,
}

impl<B> ExchangeBody<B> {
    pub fn new(inner: B, exchange: Exchange) -> Self {
        Self {
            inner,
            exchange: Some(exchange),
        }
    }

    /// Whether the exchange is still held, i.e. the body has not ended.
    pub fn is_streaming(&self) -> bool {
        self.exchange.is_some()
    }
}

impl<B> HttpBody for ExchangeBody<B>
where
    B: HttpBody + Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => this.exchange = None,
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.exchange = None,
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for ExchangeBody<B> {
    fn drop(&mut self) {
        if let Some(exchange) = &self.exchange {
            tracing::debug!(
                exchange = %exchange.id(),
                route = %exchange.route().name,
                "Response body released before it finished streaming"
            );
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            ForwardError::InvalidRequest(_) => "Request cannot be forwarded",
            _ => "Upstream request failed",
        };
        (self.status(), message).into_response()
    }
}
