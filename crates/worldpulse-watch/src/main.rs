//! Terminal observer for a WorldPulse hub.
//!
//! Mirrors the hub cache locally and logs the featured event as it
//! changes, along with source health and disable notices.

mod args;
mod client;
mod error;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    if args.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let endpoints = args.endpoints()?;
    info!(
        hub = %endpoints.ws,
        attempts = args.attempts,
        delay_ms = args.delay_ms,
        "worldpulse-watch starting"
    );

    tokio::select! {
        result = client::run(&args, &endpoints) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    Ok(())
}
