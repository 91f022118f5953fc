//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Validate configuration and compile the route table
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing)
//! - Serve with upgrade support until shutdown

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::dispatcher::Dispatcher;
use crate::http::forward::Forwarder;
use crate::http::static_files::StaticFallback;
use crate::lifecycle::Shutdown;
use crate::observability::{ExchangeObserver, LogObserver, MetricsObserver, ObserverSet};
use crate::routing::RouteTable;

/// Observer used when none is injected: log lines plus metrics counters.
pub fn default_observer() -> Arc<dyn ExchangeObserver> {
    Arc::new(
        ObserverSet::new()
            .with(Arc::new(LogObserver))
            .with(Arc::new(MetricsObserver)),
    )
}

/// HTTP server for the development proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    dispatcher: Dispatcher,
}

impl HttpServer {
    /// Create a new HTTP server with the default observer.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        Self::with_observer(config, default_observer())
    }

    /// Create a new HTTP server reporting exchanges to `observer`.
    ///
    /// Fails if the configuration does not validate; a bad target is a
    /// startup error, not a per-request one.
    pub fn with_observer(
        config: ProxyConfig,
        observer: Arc<dyn ExchangeObserver>,
    ) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let routes = RouteTable::from_config(&config)?;
        for route in routes.routes() {
            tracing::info!(
                route = %route.name,
                prefix = %route.path_prefix(),
                target = %route.target,
                upgrade = route.supports_upgrade,
                origin_rewrite = route.origin_rewrite,
                "Route loaded"
            );
        }

        let forwarder = Forwarder::new(&config.timeouts, observer);
        let fallback = StaticFallback::from_config(&config.static_files);
        let dispatcher = Dispatcher::new(routes, forwarder, fallback);

        let router = Self::build_router(dispatcher.clone());
        Ok(Self {
            router,
            config,
            dispatcher,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(dispatcher: Dispatcher) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(dispatcher)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.routes().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

async fn proxy_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    dispatcher.handle(request).await
}
