//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing layer)
//!     → dispatcher.rs (route lookup)
//!         ├─ no route → static_files.rs (ServeDir or 404)
//!         └─ route    → forward.rs (exchange.rs lifecycle + observer)
//!                         → request.rs (re-target, Host rewrite)
//!                         → upstream
//!                         → response.rs (relay head + body stream)
//!                         → websocket.rs (101 → raw byte relay)
//! ```

pub mod dispatcher;
pub mod error;
pub mod exchange;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use dispatcher::Dispatcher;
pub use error::ForwardError;
pub use exchange::{Exchange, ExchangeId, ExchangeState};
pub use forward::Forwarder;
pub use server::{default_observer, HttpServer};
pub use static_files::StaticFallback;
