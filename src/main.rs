//! API switch (v1)
//!
//! A reverse proxy for upstream API platforms built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────────────┐
//!                              │                       API SWITCH                          │
//!                              │                                                           │
//!     Client Request           │  ┌─────────┐    ┌──────────┐    ┌──────────────┐          │
//!     ─────────────────────────┼─▶│  http   │───▶│ security │───▶│   routing    │          │
//!                              │  │ server  │    │  (auth)  │    │ (group/path) │          │
//!                              │  └─────────┘    └──────────┘    └──────┬───────┘          │
//!                              │                                        │                  │
//!                              │                                        ▼                  │
//!                              │                                ┌──────────────┐           │
//!                              │                                │load_balancer │◀── health │
//!                              │                                │  (selector)  │           │
//!                              │                                └──────┬───────┘           │
//!                              │                                        │                  │
//!                              │                                        ▼                  │
//!     Client Response          │  ┌─────────┐    ┌──────────┐    ┌──────────────┐          │
//!     ◀────────────────────────┼──│response │◀───│ attempt  │◀───│  upstream    │◀─────────┼──── Platform
//!                              │  │ relay   │    │   loop   │    │   client     │          │
//!                              │  └─────────┘    └──────────┘    └──────────────┘          │
//!                              │                                                           │
//!                              │  Cross-cutting: config · observability · resilience ·     │
//!                              │                 lifecycle                                 │
//!                              └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_switch::config::{load_config, loader};
use api_switch::lifecycle::{signals, startup, Shutdown};
use api_switch::observability::{init_logging, metrics};
use api_switch::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "api-switch", version, about = "Reverse proxy for upstream API platforms")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "API_SWITCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let path = loader::resolve_path(cli.config);
    let config = load_config(&path)?;

    init_logging(&config.observability)?;
    tracing::info!(config = %path.display(), "api-switch v{} starting", env!("CARGO_PKG_VERSION"));
    startup::report(&config);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listen = config.server.listen_addr()?;
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(listen).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.signal();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
