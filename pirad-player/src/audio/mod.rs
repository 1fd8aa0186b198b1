//! Audio output backends
//!
//! The orchestrator drives exactly one [`AudioBackend`], chosen at startup:
//! [`MpvBackend`] when the mpv binary works, [`MockBackend`] in mock mode or
//! as fallback.

pub mod mock;
pub mod mpv;

pub use mock::{BackendCall, MockBackend, MockJournal};
pub use mpv::MpvBackend;

use crate::config::AudioConfig;
use crate::error::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// Stream player controlled by the orchestrator
///
/// Calls are serialized by the orchestrator lock, hence `&mut self`.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Backend name for logs and the hardware info endpoint
    fn name(&self) -> &'static str;

    /// Start streaming `url`; returns once the stream is running
    async fn start(&mut self, url: &str) -> Result<()>;

    /// Stop the current stream (no-op when idle)
    async fn stop(&mut self) -> Result<()>;

    /// Set output volume (0-100)
    async fn set_volume(&mut self, level: u8) -> Result<()>;

    /// True while a stream is running
    fn is_active(&self) -> bool;
}

/// Pick the backend for this run
pub async fn select_backend(config: &AudioConfig, mock_hardware: bool) -> Box<dyn AudioBackend> {
    if mock_hardware {
        info!("Using mock audio backend");
        return Box::new(MockBackend::new(config.mock_latency()));
    }

    match MpvBackend::probe(config).await {
        Ok(backend) => {
            info!("Using mpv audio backend ({})", config.mpv_binary.display());
            Box::new(backend)
        }
        Err(e) => {
            warn!("{}; falling back to mock audio backend", e);
            Box::new(MockBackend::new(config.mock_latency()))
        }
    }
}
