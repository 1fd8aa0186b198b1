//! HTTP server setup and routing
//!
//! Sets up the Axum router with the control endpoints and the SSE status
//! stream.

use crate::controls::ControlHandle;
use crate::error::{Error, Result};
use crate::playback::{PlaybackOrchestrator, StationLookup};
use axum::{
    routing::{get, post},
    Router,
};
use pirad_common::EventBus;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// What the player is running on, reported by `GET /api/v1/hardware`
#[derive(Debug, Clone, Serialize)]
pub struct HardwareInfo {
    /// Real GPIO edges are being watched
    pub gpio_available: bool,
    /// Name of the audio backend (`mpv` or `mock`)
    pub audio_backend: String,
    /// Mock hardware mode was requested
    pub mock_mode: bool,
}

impl HardwareInfo {
    /// Simulated input is only accepted while no real GPIO is watched
    pub fn simulation_enabled(&self) -> bool {
        self.mock_mode || !self.gpio_available
    }
}

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub orchestrator: Arc<PlaybackOrchestrator>,
    pub stations: Arc<dyn StationLookup>,
    pub controls: ControlHandle,
    pub events: Arc<EventBus>,
    pub hardware: HardwareInfo,
    /// Lowest non-zero volume the volume endpoint will apply
    pub min_volume: u8,
}

/// Build the router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let api = Router::new()
        // Status
        .route("/status", get(super::handlers::get_status))
        .route("/hardware", get(super::handlers::get_hardware))

        // Stations and playback
        .route("/stations", get(super::handlers::list_stations))
        .route("/stations/:slot/play", post(super::handlers::play_station))
        .route("/stations/:slot/toggle", post(super::handlers::toggle_station))
        .route("/playback/stop", post(super::handlers::stop_playback))

        // Volume
        .route(
            "/volume",
            get(super::handlers::get_volume).post(super::handlers::set_volume),
        )

        // Simulated hardware input
        .route("/simulate/button/:button", post(super::handlers::simulate_button))
        .route("/simulate/volume", post(super::handlers::simulate_volume));

    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/events", get(super::sse::event_stream))
        .nest("/api/v1", api)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for the web UI and local tools
        .layer(CorsLayer::permissive())
}

/// Serve the API until `shutdown` completes
pub async fn run<F>(port: u16, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
