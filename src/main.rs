//! Artist Enricher
//!
//! A single-page web service: upload a CSV of artist names, get back each
//! artist's Spotify followers, popularity, genres and top tracks.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser ──▶ request id ─▶ trace ─▶ timeout ─▶ rate limit ─▶ upload handler
//!                                                                  │
//!                          ┌───────────────────────────────────────┤
//!                          ▼                                       ▼
//!                   UploadValidator                       TransientFileStore
//!                                                                  │
//!                                                                  ▼
//!                                                         Enricher (Spotify)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use artist_enricher::lifecycle::startup::{build_server, load_app_config};
use artist_enricher::lifecycle::Shutdown;
use artist_enricher::observability;

#[derive(Parser)]
#[command(name = "artist-enricher")]
#[command(about = "Upload a CSV of artists and enrich it with Spotify data", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_app_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    observability::logging::init(&config.observability)?;

    tracing::info!("artist-enricher v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.upload.max_body_bytes,
        enrichment_timeout_secs = config.enrichment.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = build_server(config)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
