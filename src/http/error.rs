//! Forwarding failures.
//!
//! # Design Decisions
//! - Connect failures (refused, timed out) are distinct from failures after
//!   the upstream connection was established
//! - Every variant maps to a terminal response; nothing is retried

use axum::http::StatusCode;
use hyper_util::client::legacy::Error as ClientError;
use thiserror::Error;

use crate::routing::Origin;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a forwarded exchange did not produce an upstream response.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The target connection could not be established.
    #[error("upstream {origin} unreachable: {source}")]
    UpstreamUnreachable { origin: String, source: BoxError },

    /// The target failed or closed abnormally after the connection was made.
    #[error("upstream {origin} reset the exchange: {source}")]
    UpstreamReset { origin: String, source: BoxError },

    /// The inbound request could not be re-targeted at the upstream origin.
    #[error("request cannot be forwarded: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

impl ForwardError {
    pub(crate) fn from_client(err: ClientError, origin: &Origin) -> Self {
        if err.is_connect() {
            Self::UpstreamUnreachable {
                origin: origin.to_string(),
                source: Box::new(err),
            }
        } else {
            Self::UpstreamReset {
                origin: origin.to_string(),
                source: Box::new(err),
            }
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnreachable { .. } => "upstream_unreachable",
            Self::UpstreamReset { .. } => "upstream_reset",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Status surfaced to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamUnreachable { .. } | Self::UpstreamReset { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}
