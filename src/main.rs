//! Raw-content CDN proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                    RAW PROXY                     │
//!                          │                                                  │
//!     Client Request       │  ┌─────────┐    ┌─────────────┐    ┌──────────┐  │
//!     ─────────────────────┼─▶│  http   │───▶│ credentials │───▶│ upstream │──┼──▶ raw host
//!                          │  │ server  │    │  resolver   │    │  client  │  │
//!                          │  └─────────┘    └──────┬──────┘    └────┬─────┘  │
//!                          │                        │                │        │
//!                          │                  ┌─────▼─────┐          │        │
//!                          │                  │ KV store  │          │        │
//!                          │                  └───────────┘          │        │
//!     Client Response      │  ┌──────────┐    ┌──────────┐           │        │
//!     ◀────────────────────┼──│ security │◀───│ response │◀──────────┘        │
//!                          │  │ headers  │    │translate │                    │
//!                          │  └──────────┘    └──────────┘                    │
//!                          │                                                  │
//!                          │  config · observability · lifecycle             │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use raw_proxy::config::load_config;
use raw_proxy::http::HttpServer;
use raw_proxy::lifecycle::{signals, Shutdown};
use raw_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "raw-proxy")]
#[command(about = "CDN proxy for raw GitHub content with token injection", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("raw-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream_host = %config.upstream.host,
        cache_ttl_secs = config.cache.ttl_secs,
        allow_origin = %config.cors.allow_origin,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let server = HttpServer::new(&config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
