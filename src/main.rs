//! Development Reverse Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────┐
//!                     │                    DEV PROXY                      │
//!                     │                                                   │
//!   Browser request   │  ┌──────────┐    ┌────────────┐    ┌───────────┐  │
//!   ──────────────────┼─▶│  axum    │───▶│ dispatcher │───▶│  route    │  │
//!                     │  │  server  │    │            │    │  table    │  │
//!                     │  └──────────┘    └─────┬──────┘    └───────────┘  │
//!                     │          no route      │      route               │
//!                     │        ┌───────────────┴──────────┐               │
//!                     │        ▼                          ▼               │
//!                     │  ┌──────────┐              ┌────────────┐         │
//!                     │  │  static  │              │ forwarder  │─────────┼──▶ Backend
//!                     │  │  files   │              │ + exchange │◀────────┼─── (HTTP / WS)
//!                     │  └──────────┘              └─────┬──────┘         │
//!                     │                                  ▼                │
//!                     │                           ┌────────────┐          │
//!                     │                           │  observer  │          │
//!                     │                           │logs/metrics│          │
//!                     │                           └────────────┘          │
//!                     └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use dev_proxy::config::{load_config, ProxyConfig};
use dev_proxy::lifecycle::startup;
use dev_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "dev-proxy")]
#[command(about = "Forward backend API and WebSocket paths during frontend development", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in routes are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the default upstream origin (e.g. http://localhost:8080)
    #[arg(short, long)]
    target: Option<String>,

    /// Serve unmatched paths from this directory
    #[arg(long)]
    static_root: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(target) = self.target {
            config.upstream.target = target;
        }
        if let Some(root) = self.static_root {
            config.static_files.root = Some(root);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability);
    tracing::info!("dev-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;
    Ok(())
}
