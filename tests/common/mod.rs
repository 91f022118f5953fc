//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use dev_proxy::config::ProxyConfig;
use dev_proxy::http::{ForwardError, HttpServer};
use dev_proxy::observability::ExchangeObserver;
use dev_proxy::routing::Route;
use dev_proxy::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// A running mock backend.
pub struct Backend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Backend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start a backend that echoes request details, and serves `/chat` as both
/// a plain endpoint and a WebSocket echo.
///
/// Echo responses look like:
/// ```text
/// POST /fetch?x=1
/// host: 127.0.0.1:1234
/// x-test: hello
///
/// <body>
/// ```
/// The status can be chosen with an `x-respond-status` request header.
pub async fn start_backend() -> Backend {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/chat", any(chat))
        .fallback(echo)
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Backend { addr, hits }
}

async fn echo(State(hits): State<Arc<AtomicUsize>>, request: Request<Body>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    let status = header("x-respond-status")
        .parse::<u16>()
        .ok()
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::OK);
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let text = format!(
        "{} {}\nhost: {}\nx-test: {}\n\n{}",
        parts.method,
        parts.uri,
        header("host"),
        header("x-test"),
        String::from_utf8_lossy(&body)
    );
    (status, [("x-backend", "echo")], text).into_response()
}

async fn chat(
    State(hits): State<Arc<AtomicUsize>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    match ws {
        Ok(ws) => ws.on_upgrade(echo_socket),
        Err(_) => "plain chat".into_response(),
    }
}

async fn echo_socket(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(msg).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Start a raw backend that accepts one upgrade handshake, then reports when
/// the proxy closes the upgraded connection.
pub async fn start_upgrade_sink() -> (SocketAddr, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_head(&mut socket).await;
        socket
            .write_all(
                b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
            )
            .await
            .unwrap();

        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(());
    });

    (addr, closed_rx)
}

/// Start a raw backend that accepts one connection, reads the request head
/// and closes without answering.
pub async fn start_resetting_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_head(&mut socket).await;
        drop(socket);
    });

    addr
}

/// A raw backend that reads one request head and never answers.
pub struct SilentBackend {
    pub addr: SocketAddr,
    /// Fires once the request head has arrived.
    pub head_read: oneshot::Receiver<()>,
    /// Fires once the proxy closes the connection.
    pub closed: oneshot::Receiver<()>,
}

pub async fn start_silent_backend() -> SilentBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (head_tx, head_read) = oneshot::channel();
    let (closed_tx, closed) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_head(&mut socket).await;
        let _ = head_tx.send(());

        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(());
    });

    SilentBackend {
        addr,
        head_read,
        closed,
    }
}

/// Read an HTTP message head (through the blank line).
pub async fn read_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = socket.read(&mut byte).await.unwrap();
        assert!(n > 0, "connection closed before end of head");
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Default routes pointed at `target`.
pub fn proxy_config(target: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.target = target.to_string();
    config.timeouts.connect_secs = 2;
    config
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig, observer: Arc<RecordingObserver>) -> (SocketAddr, Shutdown) {
    let server = HttpServer::with_observer(config, observer).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// What a [`RecordingObserver`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Sent { route: String, method: Method, url: String },
    Received { route: String, status: u16, url: String },
    Error { route: String, kind: &'static str },
}

/// Observer that keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }
}

impl ExchangeObserver for RecordingObserver {
    fn on_request_sent(&self, route: &Route, method: &Method, url: &str) {
        self.events.lock().unwrap().push(Recorded::Sent {
            route: route.name.clone(),
            method: method.clone(),
            url: url.to_string(),
        });
    }

    fn on_response_received(&self, route: &Route, status: StatusCode, url: &str) {
        self.events.lock().unwrap().push(Recorded::Received {
            route: route.name.clone(),
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    fn on_error(&self, route: &Route, error: &ForwardError) {
        self.events.lock().unwrap().push(Recorded::Error {
            route: route.name.clone(),
            kind: error.kind(),
        });
    }
}

pub fn sent(route: &str, method: Method, url: &str) -> Recorded {
    Recorded::Sent {
        route: route.into(),
        method,
        url: url.into(),
    }
}

pub fn received(route: &str, status: u16, url: &str) -> Recorded {
    Recorded::Received {
        route: route.into(),
        status,
        url: url.into(),
    }
}
