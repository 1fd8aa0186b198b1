//! Playback-related type definitions
//!
//! Station slots, the playback state machine states and the status snapshot
//! shared between the player, its HTTP API and status subscribers.

use serde::{Deserialize, Serialize};

use crate::Error;

/// One of the three fixed station assignment positions (1..=3)
///
/// Construction goes through `TryFrom<u8>`, so an invalid slot number can
/// never reach playback logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    /// Lowest valid slot number
    pub const MIN: u8 = 1;
    /// Highest valid slot number
    pub const MAX: u8 = 3;

    /// Slot number (1..=3)
    pub fn get(self) -> u8 {
        self.0
    }

    /// All slots in ascending order
    pub fn all() -> [Slot; 3] {
        [Slot(1), Slot(2), Slot(3)]
    }
}

impl TryFrom<u8> for Slot {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Slot(value))
        } else {
            Err(Error::InvalidInput(format!(
                "slot must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing playing
    #[default]
    Stopped,
    /// Stream start requested, backend not yet confirmed
    Connecting,
    /// Stream running
    Playing,
    /// Last start attempt failed
    Error,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Connecting => write!(f, "connecting"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Current system status snapshot
///
/// `is_playing` is true exactly when `playback_state` is `Playing`, and
/// `current_slot` is set only while a start attempt is in flight or has
/// succeeded. The transition methods below are the only writers that keep
/// both rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Slot currently playing or connecting
    pub current_slot: Option<Slot>,
    /// Volume level (0-100)
    pub volume: u8,
    /// Whether audio is currently playing
    pub is_playing: bool,
    /// Detailed playback state
    pub playback_state: PlaybackState,
    /// Name of the station in `current_slot`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
}

impl SystemStatus {
    /// Create a stopped status with the given volume (clamped to 100)
    pub fn new(volume: u8) -> Self {
        Self {
            current_slot: None,
            volume: volume.min(100),
            is_playing: false,
            playback_state: PlaybackState::Stopped,
            station_name: None,
        }
    }

    /// Start attempt for `slot` is in flight
    pub fn begin_connecting(&mut self, slot: Slot, station_name: &str) {
        self.current_slot = Some(slot);
        self.station_name = Some(station_name.to_string());
        self.is_playing = false;
        self.playback_state = PlaybackState::Connecting;
    }

    /// Backend confirmed the stream for the current slot
    pub fn mark_playing(&mut self) {
        self.is_playing = true;
        self.playback_state = PlaybackState::Playing;
    }

    /// Start attempt failed
    pub fn mark_failed(&mut self) {
        self.current_slot = None;
        self.station_name = None;
        self.is_playing = false;
        self.playback_state = PlaybackState::Error;
    }

    /// Playback stopped
    pub fn mark_stopped(&mut self) {
        self.current_slot = None;
        self.station_name = None;
        self.is_playing = false;
        self.playback_state = PlaybackState::Stopped;
    }

    /// True when `slot` is the slot currently playing
    pub fn is_playing_slot(&self, slot: Slot) -> bool {
        self.is_playing && self.current_slot == Some(slot)
    }

    /// Check the status invariants
    pub fn is_consistent(&self) -> bool {
        let playing_matches = self.is_playing == (self.playback_state == PlaybackState::Playing);
        let slot_matches = match self.playback_state {
            PlaybackState::Connecting | PlaybackState::Playing => {
                self.current_slot.is_some() && self.station_name.is_some()
            }
            PlaybackState::Stopped | PlaybackState::Error => {
                self.current_slot.is_none() && self.station_name.is_none()
            }
        };
        playing_matches && slot_matches && self.volume <= 100
    }
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::new(50)
    }
}
