//! Playback orchestrator
//!
//! Single owner of the audio backend and the [`SystemStatus`]. Every
//! operation takes one async lock for its whole duration, so hardware
//! gestures and API requests are applied one at a time in arrival order and
//! two streams can never overlap.
//!
//! State machine:
//!
//! ```text
//! Stopped --play--> Connecting --ok--> Playing --stop--> Stopped
//!                        |
//!                        +--fail--> Error --play--> Connecting
//! Playing(A) --play(B)--> Connecting(B)   (A is always stopped first)
//! ```
//!
//! Operations report success as `bool`; backend failures are logged and
//! reflected in the status, never returned.

use super::sink::StatusSink;
use super::stations::StationLookup;
use crate::audio::AudioBackend;
use pirad_common::{Slot, StatusEventType, SystemStatus};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

struct Inner {
    backend: Box<dyn AudioBackend>,
    status: SystemStatus,
}

/// Serializes playback operations and publishes status changes
pub struct PlaybackOrchestrator {
    inner: Mutex<Inner>,
    status_tx: watch::Sender<SystemStatus>,
    stations: Arc<dyn StationLookup>,
    sink: Arc<dyn StatusSink>,
    backend_name: &'static str,
}

impl PlaybackOrchestrator {
    /// Create an orchestrator in the stopped state
    ///
    /// The backend volume is not touched here; call
    /// [`set_volume`](Self::set_volume) once at startup to apply it.
    pub fn new(
        backend: Box<dyn AudioBackend>,
        stations: Arc<dyn StationLookup>,
        sink: Arc<dyn StatusSink>,
        default_volume: u8,
    ) -> Self {
        let status = SystemStatus::new(default_volume);
        let (status_tx, _) = watch::channel(status.clone());
        let backend_name = backend.name();

        Self {
            inner: Mutex::new(Inner { backend, status }),
            status_tx,
            stations,
            sink,
            backend_name,
        }
    }

    /// Current status snapshot
    ///
    /// Does not wait for a running operation, so it may show `Connecting`.
    pub fn get_status(&self) -> SystemStatus {
        self.status_tx.borrow().clone()
    }

    /// Name of the audio backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Play the station in `slot`
    ///
    /// Returns `false` when the slot is empty (status untouched) or the
    /// backend failed to start (status `Error`).
    pub async fn play(&self, slot: Slot) -> bool {
        let mut inner = self.inner.lock().await;
        self.play_locked(&mut inner, slot).await
    }

    /// Stop playback; always succeeds
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        self.stop_locked(&mut inner).await
    }

    /// Stop if `slot` is playing, otherwise play it
    ///
    /// Returns `true` when `slot` is playing afterwards.
    pub async fn toggle(&self, slot: Slot) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.status.is_playing_slot(slot) {
            info!("Toggle slot {}: stopping", slot);
            self.stop_locked(&mut inner).await;
            false
        } else {
            info!("Toggle slot {}: playing", slot);
            self.play_locked(&mut inner, slot).await
        }
    }

    /// Set the volume, clamped to 0-100
    ///
    /// On backend failure the status volume stays unchanged and `false` is
    /// returned. With `broadcast` a `volume_update` notification is sent.
    pub async fn set_volume(&self, level: i32, broadcast: bool) -> bool {
        let mut inner = self.inner.lock().await;
        self.set_volume_locked(&mut inner, clamp_volume(level), broadcast)
            .await
    }

    /// Change the volume by `delta` (rotary encoder path)
    pub async fn adjust_volume(&self, delta: i32) -> bool {
        let mut inner = self.inner.lock().await;
        let current = inner.status.volume;
        let target = clamp_volume(i32::from(current) + delta);
        if target == current {
            debug!("Volume already at {}", current);
            return true;
        }
        self.set_volume_locked(&mut inner, target, true).await
    }

    /// Stop playback before the process exits
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.backend.is_active() || inner.status.current_slot.is_some() {
            info!("Stopping playback for shutdown");
            self.stop_locked(&mut inner).await;
        }
    }

    async fn play_locked(&self, inner: &mut Inner, slot: Slot) -> bool {
        let Some(station) = self.stations.get(slot) else {
            warn!("No station assigned to slot {}", slot);
            return false;
        };

        if inner.backend.is_active() {
            if let Err(e) = inner.backend.stop().await {
                error!("Failed to stop previous stream: {}", e);
            }
        }

        inner.status.begin_connecting(slot, &station.name);
        self.publish(inner, StatusEventType::PlaybackStatus).await;

        info!("Starting '{}' ({}) in slot {}", station.name, station.url, slot);
        match inner.backend.start(&station.url).await {
            Ok(()) => {
                inner.status.mark_playing();
                self.publish(inner, StatusEventType::PlaybackStatus).await;
                info!("Playing slot {}", slot);
                true
            }
            Err(e) => {
                error!("Failed to start slot {}: {}", slot, e);
                inner.status.mark_failed();
                self.publish(inner, StatusEventType::PlaybackStatus).await;
                false
            }
        }
    }

    async fn stop_locked(&self, inner: &mut Inner) -> bool {
        if let Err(e) = inner.backend.stop().await {
            error!("Backend stop failed: {}", e);
        }
        inner.status.mark_stopped();
        self.publish(inner, StatusEventType::PlaybackStatus).await;
        info!("Playback stopped");
        true
    }

    async fn set_volume_locked(&self, inner: &mut Inner, level: u8, broadcast: bool) -> bool {
        if let Err(e) = inner.backend.set_volume(level).await {
            error!("Failed to set volume to {}: {}", level, e);
            return false;
        }

        inner.status.volume = level;
        if broadcast {
            self.publish(inner, StatusEventType::VolumeUpdate).await;
        } else {
            self.status_tx.send_replace(inner.status.clone());
        }
        debug!("Volume set to {}", level);
        true
    }

    /// Publish the status snapshot; called with the lock held
    async fn publish(&self, inner: &Inner, event_type: StatusEventType) {
        debug_assert!(inner.status.is_consistent());
        self.status_tx.send_replace(inner.status.clone());
        if let Err(e) = self.sink.notify(event_type, &inner.status).await {
            warn!("Status notification failed: {}", e);
        }
    }
}

fn clamp_volume(level: i32) -> u8 {
    // Lossless: clamped into 0..=100 first
    level.clamp(0, 100) as u8
}
