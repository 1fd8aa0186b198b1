//! # pirad Common Library
//!
//! Shared code for the pirad internet radio appliance:
//! - Playback model (`Slot`, `SystemStatus`, `PlaybackState`)
//! - Status events and the broadcast `EventBus`
//! - Station model and URL validation
//! - Configuration file resolution and TOML loading

pub mod config;
pub mod error;
pub mod events;
pub mod station;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, Slot, StatusEventType, StatusUpdate, SystemStatus};
pub use station::Station;
