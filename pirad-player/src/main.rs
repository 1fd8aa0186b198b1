//! pirad player - Main entry point
//!
//! Wires configuration, station lookup, audio backend, orchestrator,
//! control loop, GPIO edge source and the HTTP server together, then runs
//! until Ctrl+C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pirad_common::EventBus;
use pirad_player::api::{self, AppContext, HardwareInfo};
use pirad_player::audio::select_backend;
use pirad_player::hardware::source::open_edge_source;
use pirad_player::hardware::ControlMap;
use pirad_player::playback::{EventBusSink, JsonStationStore, StationLookup};
use pirad_player::{ControlLoop, PlaybackOrchestrator, PlayerConfig};

/// Status events buffered for slow SSE clients
const EVENT_BUS_CAPACITY: usize = 100;

/// Command-line arguments for pirad-player
#[derive(Parser, Debug)]
#[command(name = "pirad-player")]
#[command(about = "Internet radio player for Raspberry Pi")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "PIRAD_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "PIRAD_PORT")]
    port: Option<u16>,

    /// Run without GPIO and mpv (overrides config)
    #[arg(long, env = "PIRAD_MOCK_HARDWARE")]
    mock: bool,

    /// Station file (overrides config)
    #[arg(long, env = "PIRAD_STATIONS_FILE")]
    stations: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.mock {
        config.mock_hardware = true;
    }
    if let Some(stations) = args.stations {
        config.stations_file = stations;
    }

    // Initialize tracing
    let default_filter = format!(
        "pirad_player={level},pirad_common={level},tower_http=info",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pirad player v{}", env!("CARGO_PKG_VERSION"));
    if config.mock_hardware {
        warn!("Mock hardware mode enabled");
    }

    let stations: Arc<dyn StationLookup> = Arc::new(
        JsonStationStore::load(&config.stations_file).context("Failed to load stations")?,
    );

    let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));

    let backend = select_backend(&config.audio, config.mock_hardware).await;
    let orchestrator = Arc::new(PlaybackOrchestrator::new(
        backend,
        Arc::clone(&stations),
        Arc::new(EventBusSink::new(Arc::clone(&events))),
        config.audio.default_volume,
    ));
    if !orchestrator
        .set_volume(i32::from(config.audio.default_volume), false)
        .await
    {
        warn!("Initial volume could not be applied");
    }
    info!("Playback orchestrator initialized ({} backend)", orchestrator.backend_name());

    let map = ControlMap::from_config(&config.gpio).context("Invalid GPIO configuration")?;
    let (controls, control_task) = ControlLoop::spawn(
        &config.controls,
        config.actions.clone(),
        map.clone(),
        Arc::clone(&orchestrator),
    );

    let edge_source = open_edge_source(
        config.mock_hardware,
        &map,
        config.controls.rotary_debounce(),
        controls.inputs(),
    );
    info!("Hardware input: {}", edge_source.name());

    let ctx = AppContext {
        orchestrator: Arc::clone(&orchestrator),
        stations,
        controls,
        events,
        hardware: HardwareInfo {
            gpio_available: edge_source.is_hardware(),
            audio_backend: orchestrator.backend_name().to_string(),
            mock_mode: config.mock_hardware,
        },
        min_volume: config.audio.min_volume,
    };

    let served = api::run(config.port, ctx, shutdown_signal()).await;

    // Release interrupts first so no new input arrives while stopping
    drop(edge_source);
    control_task.abort();
    orchestrator.shutdown().await;

    served.context("HTTP server failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
