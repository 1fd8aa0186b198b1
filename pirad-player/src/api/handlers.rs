//! HTTP request handlers
//!
//! Playback endpoints call the same orchestrator operations as the hardware
//! controls; simulation endpoints go through the control loop.

use crate::api::server::{AppContext, HardwareInfo};
use crate::error::Error;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pirad_common::{Slot, Station, SystemStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn api_error(code: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", message),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct StationSlot {
    slot: Slot,
    station: Option<Station>,
}

#[derive(Debug, Serialize)]
pub struct StationsResponse {
    stations: Vec<StationSlot>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    is_playing: bool,
    status: SystemStatus,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: i32, // 0-100; 1..min_volume is raised to min_volume
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    volume: u8,
}

#[derive(Debug, Deserialize)]
pub struct SimulateVolumeRequest {
    delta: i32,
}

fn parse_slot(raw: &str) -> Result<Slot, ApiError> {
    raw.trim()
        .parse::<u8>()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("invalid slot '{}'", raw)))
        .and_then(|n| Slot::try_from(n).map_err(|e| api_error(StatusCode::BAD_REQUEST, e)))
}

/// Volume actually applied for a requested level
///
/// Levels between 0 and `min_volume` are raised to `min_volume`; 0 stays 0
/// (mute).
pub fn effective_volume(requested: u8, min_volume: u8) -> u8 {
    if requested > 0 && requested < min_volume {
        min_volume
    } else {
        requested
    }
}

// ============================================================================
// Health and Status
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "pirad-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/v1/status - Current system status
pub async fn get_status(State(ctx): State<AppContext>) -> Json<SystemStatus> {
    Json(ctx.orchestrator.get_status())
}

/// GET /api/v1/hardware - Input and audio drivers in use
pub async fn get_hardware(State(ctx): State<AppContext>) -> Json<HardwareInfo> {
    Json(ctx.hardware.clone())
}

// ============================================================================
// Stations and Playback
// ============================================================================

/// GET /api/v1/stations - Station assigned to each slot
pub async fn list_stations(State(ctx): State<AppContext>) -> Json<StationsResponse> {
    let stations = ctx
        .stations
        .all()
        .into_iter()
        .map(|(slot, station)| StationSlot { slot, station })
        .collect();
    Json(StationsResponse { stations })
}

/// POST /api/v1/stations/{slot}/play - Play a slot
pub async fn play_station(
    State(ctx): State<AppContext>,
    Path(slot): Path<String>,
) -> Result<Json<SystemStatus>, ApiError> {
    let slot = parse_slot(&slot)?;
    info!("Play request for slot {}", slot);

    if ctx.stations.get(slot).is_none() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("no station assigned to slot {}", slot),
        ));
    }

    if ctx.orchestrator.play(slot).await {
        Ok(Json(ctx.orchestrator.get_status()))
    } else {
        Err(api_error(
            StatusCode::BAD_GATEWAY,
            format!("failed to start stream for slot {}", slot),
        ))
    }
}

/// POST /api/v1/stations/{slot}/toggle - Play or stop a slot
pub async fn toggle_station(
    State(ctx): State<AppContext>,
    Path(slot): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let slot = parse_slot(&slot)?;
    let is_playing = ctx.orchestrator.toggle(slot).await;
    Ok(Json(ToggleResponse {
        is_playing,
        status: ctx.orchestrator.get_status(),
    }))
}

/// POST /api/v1/playback/stop - Stop playback
pub async fn stop_playback(State(ctx): State<AppContext>) -> Json<SystemStatus> {
    ctx.orchestrator.stop().await;
    Json(ctx.orchestrator.get_status())
}

// ============================================================================
// Volume
// ============================================================================

/// GET /api/v1/volume - Current volume
pub async fn get_volume(State(ctx): State<AppContext>) -> Json<VolumeResponse> {
    Json(VolumeResponse {
        volume: ctx.orchestrator.get_status().volume,
    })
}

/// POST /api/v1/volume - Set volume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<VolumeResponse>, ApiError> {
    let requested = u8::try_from(req.volume)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("volume must be 0-100, got {}", req.volume),
            )
        })?;

    let level = effective_volume(requested, ctx.min_volume);
    if level != requested {
        info!("Volume {} raised to minimum {}", requested, level);
    }

    if ctx.orchestrator.set_volume(i32::from(level), true).await {
        Ok(Json(VolumeResponse { volume: level }))
    } else {
        Err(api_error(StatusCode::BAD_GATEWAY, "audio backend rejected volume"))
    }
}

// ============================================================================
// Simulation
// ============================================================================

fn ensure_simulation_enabled(hardware: &HardwareInfo) -> Result<(), ApiError> {
    if hardware.simulation_enabled() {
        return Ok(());
    }
    warn!("Simulated input rejected: GPIO hardware is active");
    Err(api_error(
        StatusCode::CONFLICT,
        "simulation is disabled while GPIO hardware is active",
    ))
}

fn simulation_error(e: Error) -> ApiError {
    match e {
        Error::InvalidInput(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        other => {
            warn!("Simulation failed: {}", other);
            api_error(StatusCode::SERVICE_UNAVAILABLE, other)
        }
    }
}

/// POST /api/v1/simulate/button/{button} - Press a button (1-3 stations, 4 rotary switch)
pub async fn simulate_button(
    State(ctx): State<AppContext>,
    Path(button): Path<String>,
) -> Result<Json<SystemStatus>, ApiError> {
    ensure_simulation_enabled(&ctx.hardware)?;
    let button = button
        .trim()
        .parse::<u8>()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("invalid button '{}'", button)))?;

    ctx.controls
        .simulate_button_press(button)
        .await
        .map_err(simulation_error)?;
    Ok(Json(ctx.orchestrator.get_status()))
}

/// POST /api/v1/simulate/volume - Turn the rotary encoder
pub async fn simulate_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<SimulateVolumeRequest>,
) -> Result<Json<SystemStatus>, ApiError> {
    ensure_simulation_enabled(&ctx.hardware)?;
    ctx.controls
        .simulate_volume_change(req.delta)
        .await
        .map_err(simulation_error)?;
    Ok(Json(ctx.orchestrator.get_status()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_gate() {
        let mut hardware = HardwareInfo {
            gpio_available: true,
            audio_backend: "mpv".to_string(),
            mock_mode: false,
        };
        assert!(ensure_simulation_enabled(&hardware).is_err());

        hardware.mock_mode = true;
        assert!(ensure_simulation_enabled(&hardware).is_ok());

        hardware.mock_mode = false;
        hardware.gpio_available = false;
        assert!(ensure_simulation_enabled(&hardware).is_ok());
    }

    #[test]
    fn test_effective_volume() {
        assert_eq!(effective_volume(0, 30), 0);
        assert_eq!(effective_volume(1, 30), 30);
        assert_eq!(effective_volume(29, 30), 30);
        assert_eq!(effective_volume(30, 30), 30);
        assert_eq!(effective_volume(75, 30), 75);
    }

    #[test]
    fn test_parse_slot() {
        assert_eq!(parse_slot("2").unwrap().get(), 2);
        assert_eq!(parse_slot("0").unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(parse_slot("four").unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
