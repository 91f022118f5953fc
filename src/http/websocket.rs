//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests
//! - Hand the upstream's `101 Switching Protocols` back to the caller
//! - Relay raw bytes between the two upgraded connections
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - WebSocket frames are not interpreted; the handshake is the only HTTP
//! - When one side finishes, the other gets a bounded grace period to drain
//! - An I/O error on either side drops both connections at once

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::http::{header, HeaderMap};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::exchange::{Exchange, ExchangeState};

/// True when the headers carry a WebSocket handshake
/// (`Connection: upgrade` and `Upgrade: websocket`, any case).
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    fn lists(headers: &HeaderMap, name: header::HeaderName, token: &str) -> bool {
        headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }

    lists(headers, header::CONNECTION, "upgrade") && lists(headers, header::UPGRADE, "websocket")
}

/// Byte counts of a finished relay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub to_upstream: u64,
    pub to_caller: u64,
    /// The second direction was cut off after the close grace period.
    pub forced_close: bool,
}

/// Copy bytes both ways until both sides close, or until one side closes
/// and the other has not followed within `close_grace`.
///
/// Byte counts include everything written before a forced close.
pub async fn relay<C, U>(caller: C, upstream: U, close_grace: Duration) -> io::Result<RelayStats>
where
    C: AsyncRead + AsyncWrite,
    U: AsyncRead + AsyncWrite,
{
    let (mut caller_rd, mut caller_wr) = tokio::io::split(caller);
    let (mut upstream_rd, mut upstream_wr) = tokio::io::split(upstream);
    let sent = AtomicU64::new(0);
    let received = AtomicU64::new(0);

    let to_upstream = pipe(&mut caller_rd, &mut upstream_wr, &sent);
    let to_caller = pipe(&mut upstream_rd, &mut caller_wr, &received);
    tokio::pin!(to_upstream, to_caller);

    let forced_close = tokio::select! {
        done = &mut to_upstream => {
            done?;
            drain(to_caller, close_grace).await?
        }
        done = &mut to_caller => {
            done?;
            drain(to_upstream, close_grace).await?
        }
    };

    Ok(RelayStats {
        to_upstream: sent.load(Ordering::Relaxed),
        to_caller: received.load(Ordering::Relaxed),
        forced_close,
    })
}

/// Copy until EOF, counting into `copied` as bytes are written.
async fn pipe<R, W>(reader: &mut R, writer: &mut W, copied: &AtomicU64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        copied.fetch_add(n as u64, Ordering::Relaxed);
    }
    // Propagate EOF; the peer may already be gone.
    let _ = writer.shutdown().await;
    Ok(())
}

/// Give the remaining direction `close_grace` to finish. Returns whether it
/// had to be cut off.
async fn drain<F>(direction: Pin<&mut F>, close_grace: Duration) -> io::Result<bool>
where
    F: Future<Output = io::Result<()>>,
{
    match tokio::time::timeout(close_grace, direction).await {
        Ok(done) => done.map(|()| false),
        Err(_) => Ok(true),
    }
}

/// Complete both upgrades and relay until the connection ends.
///
/// The exchange moves into the relay task and is released with it.
pub(crate) fn spawn_relay(
    mut exchange: Exchange,
    caller: OnUpgrade,
    upstream: OnUpgrade,
    close_grace: Duration,
) {
    tokio::spawn(async move {
        let (caller, upstream) = tokio::join!(caller, upstream);

        let caller = match caller {
            Ok(io) => io,
            Err(e) => {
                tracing::debug!(
                    exchange = %exchange.id(),
                    error = %e,
                    "Caller left before the upgrade completed; closing upstream"
                );
                return;
            }
        };
        let upstream = match upstream {
            Ok(io) => io,
            Err(e) => {
                tracing::warn!(
                    exchange = %exchange.id(),
                    route = %exchange.route().name,
                    error = %e,
                    "Upstream upgrade failed; closing caller"
                );
                exchange.advance(ExchangeState::Failed);
                return;
            }
        };

        tracing::debug!(exchange = %exchange.id(), route = %exchange.route().name, "WebSocket relay started");

        match relay(TokioIo::new(caller), TokioIo::new(upstream), close_grace).await {
            Ok(stats) => tracing::debug!(
                exchange = %exchange.id(),
                to_upstream = stats.to_upstream,
                to_caller = stats.to_caller,
                forced_close = stats.forced_close,
                "WebSocket relay closed"
            ),
            Err(e) => {
                tracing::debug!(exchange = %exchange.id(), error = %e, "WebSocket relay ended abruptly");
                exchange.advance(ExchangeState::Failed);
            }
        }
    });
}
