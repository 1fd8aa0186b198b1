//! Rotary encoder decoding
//!
//! Turns clock/data edges into signed volume steps. Only rising clock
//! edges count; the data line decides the direction.

use super::Level;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Converts encoder edges into volume deltas
#[derive(Debug)]
pub struct RotaryDecoder {
    volume_step: i32,
    clockwise_increases: bool,
    debounce: Duration,
    last_accepted_at: Option<Instant>,
}

impl RotaryDecoder {
    pub fn new(volume_step: u8, clockwise_increases: bool, debounce: Duration) -> Self {
        Self {
            volume_step: i32::from(volume_step),
            clockwise_increases,
            debounce,
            last_accepted_at: None,
        }
    }

    /// Decode one edge, returning the volume delta for an accepted detent
    pub fn on_edge(&mut self, clock: Level, data: Level, at: Instant) -> Option<i32> {
        if clock != Level::High {
            return None;
        }

        if let Some(last) = self.last_accepted_at {
            if at.saturating_duration_since(last) < self.debounce {
                debug!("Rotary edge within debounce interval, dropped");
                return None;
            }
        }
        self.last_accepted_at = Some(at);

        let clockwise = data == Level::Low;
        let delta = if clockwise == self.clockwise_increases {
            self.volume_step
        } else {
            -self.volume_step
        };
        debug!(clockwise, delta, "Rotary step");
        Some(delta)
    }

    /// Data level that produces a step in the requested direction
    pub fn data_level_for(&self, increase: bool) -> Level {
        let clockwise = increase == self.clockwise_increases;
        if clockwise {
            Level::Low
        } else {
            Level::High
        }
    }

    pub fn volume_step(&self) -> i32 {
        self.volume_step
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}
