//! # pirad Player Library (pirad-player)
//!
//! Internet radio daemon for a Raspberry Pi with three station buttons and
//! a rotary encoder.
//!
//! **Purpose:** Turn button presses and encoder turns into playback
//! operations, drive the stream player, and provide an HTTP/SSE control
//! interface.
//!
//! **Architecture:** GPIO interrupts and simulated input post to one control
//! loop; the control loop and the HTTP handlers call a single
//! `PlaybackOrchestrator` that owns the audio backend (mpv or mock).

pub mod api;
pub mod audio;
pub mod config;
pub mod controls;
pub mod error;
pub mod hardware;
pub mod playback;

pub use config::PlayerConfig;
pub use controls::{ControlHandle, ControlLoop};
pub use error::{Error, Result};
pub use playback::PlaybackOrchestrator;
