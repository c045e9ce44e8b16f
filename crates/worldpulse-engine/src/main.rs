//! Engine binary for WorldPulse.
//!
//! Wires the source adapters, the scheduler, and the distribution hub
//! together and runs until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `WORLDPULSE_CONFIG` (default `worldpulse.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the hub state and start the HTTP + `WebSocket` server
//! 4. Register every enabled source with the scheduler
//! 5. Start all adapters
//! 6. Wait for Ctrl+C or SIGTERM, then stop adapters and the server

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worldpulse_core::config::{LoggingConfig, WorldPulseConfig};
use worldpulse_core::scheduler::Scheduler;
use worldpulse_core::source::EventSource;
use worldpulse_hub::{HubState, spawn_hub};
use worldpulse_sources::{
    AsteroidSource, AuroraSource, EarthquakeSource, IssSource, PlanetSource, VolcanoSource,
    build_client,
};

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "worldpulse.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the HTTP client, or the hub
/// listener cannot be set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    run().await?;
    Ok(())
}

/// Run the startup sequence, then serve until a shutdown signal.
async fn run() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path = config_path(std::env::var("WORLDPULSE_CONFIG").ok());
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config = %config_path.display(),
        config_found = config_path.exists(),
        capacity = config.cache.capacity,
        "worldpulse-engine starting"
    );

    // 3. Start the hub.
    let shutdown = CancellationToken::new();
    let state = Arc::new(HubState::new(config.cache.capacity));
    let hub = spawn_hub(&config.server, Arc::clone(&state), shutdown.clone()).await?;
    info!(addr = %hub.addr, "Hub started");

    // 4. Register sources.
    let client = build_client()?;
    let mut scheduler = Scheduler::new(Arc::clone(&state) as _);
    register(&mut scheduler, &config, EarthquakeSource::new(client.clone()));
    register(&mut scheduler, &config, IssSource::new(client.clone()));
    register(&mut scheduler, &config, VolcanoSource::new(client.clone()));
    register(&mut scheduler, &config, AuroraSource::new(client.clone()));
    register(&mut scheduler, &config, AsteroidSource::from_env(client));
    register(&mut scheduler, &config, PlanetSource::new());
    state.register_sources(scheduler.health()).await;

    // 5. Start polling.
    let started = scheduler.start_all();
    info!(started, "Engine running");

    // 6. Run until interrupted.
    shutdown_signal().await?;
    info!("Shutdown signal received");

    scheduler.shutdown().await;
    shutdown.cancel();
    if let Err(e) = hub.handle.await {
        tracing::warn!(error = %e, "Hub task ended abnormally");
    }

    info!("worldpulse-engine shutdown complete");
    Ok(())
}

/// Register `source` unless its configuration disables it.
fn register<S: EventSource>(scheduler: &mut Scheduler, config: &WorldPulseConfig, source: S) {
    let key = source.key().to_owned();
    if !config.source_enabled(&key) {
        info!(source = key, "Source disabled by configuration");
        return;
    }
    let settings = config.adapter_settings(&key, source.default_settings());
    info!(
        source = key,
        name = source.name(),
        interval_ms = u64::try_from(settings.interval.as_millis()).unwrap_or(u64::MAX),
        max_errors = settings.max_errors,
        "Source registered"
    );
    scheduler.add(source, settings);
}

/// The configuration path from `WORLDPULSE_CONFIG`, or the default.
fn config_path(from_env: Option<String>) -> PathBuf {
    from_env
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration from `path`, or use defaults if the file is absent.
///
/// Environment overrides apply in both cases.
fn load_config(path: &Path) -> Result<WorldPulseConfig, EngineError> {
    if path.exists() {
        Ok(WorldPulseConfig::from_file(path)?)
    } else {
        let mut config = WorldPulseConfig::default();
        config.server.apply_env_overrides()?;
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Wait for Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() -> Result<(), EngineError> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| EngineError::Signal {
                message: format!("failed to install Ctrl+C handler: {e}"),
            })
    };

    #[cfg(unix)]
    let terminate = async {
        let mut term =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).map_err(
                |e| EngineError::Signal {
                    message: format!("failed to install SIGTERM handler: {e}"),
                },
            )?;
        term.recv().await;
        Ok::<(), EngineError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), EngineError>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}
