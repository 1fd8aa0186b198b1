//! Hardware input: buttons, rotary encoder and the channel that carries
//! their edges into the control loop
//!
//! Interrupt callbacks run on foreign threads and never touch playback
//! state. They only post a [`HardwareInput`] through an [`InputSender`];
//! the control loop (see `crate::controls`) consumes the channel and owns
//! the [`dispatcher::HardwareEventDispatcher`] and [`rotary::RotaryDecoder`].

pub mod dispatcher;
pub mod rotary;
pub mod source;

#[cfg(feature = "gpio")]
pub mod gpio;

use crate::config::GpioConfig;
use crate::error::{Error, Result};
use pirad_common::Slot;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Button number used by the simulation API for the rotary push switch
pub const ROTARY_SWITCH_BUTTON: u8 = 4;

/// Identifier of a physical control (its BCM pin number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub u8);

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// What a push control does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRole {
    /// Station preset button
    Station(Slot),
    /// Push switch of the rotary encoder (long and triple press capable)
    RotarySwitch,
}

impl ControlRole {
    /// Only the rotary switch distinguishes long and triple presses
    pub fn detects_multi_press(&self) -> bool {
        matches!(self, ControlRole::RotarySwitch)
    }
}

/// Pin assignment of all controls
#[derive(Debug, Clone)]
pub struct ControlMap {
    roles: HashMap<ControlId, ControlRole>,
    stations: [ControlId; 3],
    rotary_switch: ControlId,
    rotary_clk: ControlId,
    rotary_dt: ControlId,
}

impl ControlMap {
    /// Build the map from the `[gpio]` config section
    pub fn from_config(config: &GpioConfig) -> Result<Self> {
        let stations: [ControlId; 3] = match config.station_pins.as_slice() {
            [a, b, c] => [ControlId(*a), ControlId(*b), ControlId(*c)],
            pins => {
                return Err(Error::Config(format!(
                    "expected 3 station pins, got {}",
                    pins.len()
                )))
            }
        };

        let mut roles = HashMap::new();
        for (control, slot) in stations.iter().zip(Slot::all()) {
            roles.insert(*control, ControlRole::Station(slot));
        }
        let rotary_switch = ControlId(config.rotary_sw);
        roles.insert(rotary_switch, ControlRole::RotarySwitch);

        Ok(Self {
            roles,
            stations,
            rotary_switch,
            rotary_clk: ControlId(config.rotary_clk),
            rotary_dt: ControlId(config.rotary_dt),
        })
    }

    /// Role of a push control, `None` for unknown ids
    pub fn role(&self, control: ControlId) -> Option<ControlRole> {
        self.roles.get(&control).copied()
    }

    /// Push control for a simulation button number (1-3 stations, 4 rotary switch)
    pub fn button(&self, number: u8) -> Option<ControlId> {
        match number {
            ROTARY_SWITCH_BUTTON => Some(self.rotary_switch),
            n => Slot::try_from(n).ok().map(|slot| self.station_control(slot)),
        }
    }

    /// Button wired to a station slot
    pub fn station_control(&self, slot: Slot) -> ControlId {
        self.stations[usize::from(slot.get() - Slot::MIN)]
    }

    pub fn rotary_clk(&self) -> ControlId {
        self.rotary_clk
    }

    pub fn rotary_dt(&self) -> ControlId {
        self.rotary_dt
    }

    /// All push controls (stations first, then the rotary switch)
    pub fn push_controls(&self) -> impl Iterator<Item = (ControlId, ControlRole)> + '_ {
        self.stations
            .iter()
            .chain(std::iter::once(&self.rotary_switch))
            .filter_map(|id| self.role(*id).map(|role| (*id, role)))
    }
}

/// Logic level of an input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Message consumed by the control loop
#[derive(Debug)]
pub enum HardwareInput {
    /// Push control changed state
    Button {
        control: ControlId,
        pressed: bool,
        at: Instant,
    },
    /// Rotary encoder clock edge, with the data line sampled at the same time
    Rotary {
        clock: Level,
        data: Level,
        at: Instant,
    },
    /// Long-press timer of a press interaction ran out
    LongPressElapsed { control: ControlId, seq: u64 },
    /// Multi-press window after a release closed
    PressWindowElapsed { control: ControlId, seq: u64 },
    /// Acknowledged once every input posted before it has been handled
    Flush(oneshot::Sender<()>),
}

/// Thread-safe handle for posting inputs to the control loop
///
/// Cloneable and callable from any thread, including GPIO interrupt threads.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: mpsc::UnboundedSender<HardwareInput>,
}

impl InputSender {
    /// Create a sender and the receiver the control loop reads from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HardwareInput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post an input; fails only when the control loop has stopped
    pub fn post(&self, input: HardwareInput) -> Result<()> {
        self.tx.send(input).map_err(|_| Error::ControlLoopClosed)
    }

    /// Post a push control edge stamped with the current time
    pub fn button(&self, control: ControlId, pressed: bool) -> Result<()> {
        self.post(HardwareInput::Button {
            control,
            pressed,
            at: Instant::now(),
        })
    }

    /// Post a rotary clock edge stamped with the current time
    pub fn rotary(&self, clock: Level, data: Level) -> Result<()> {
        self.post(HardwareInput::Rotary {
            clock,
            data,
            at: Instant::now(),
        })
    }

    /// Wait until the control loop has handled everything posted so far
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.post(HardwareInput::Flush(done_tx))?;
        done_rx.await.map_err(|_| Error::ControlLoopClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: u8) -> Slot {
        Slot::try_from(n).unwrap()
    }

    #[test]
    fn test_control_map_roles() {
        let map = ControlMap::from_config(&GpioConfig::default()).unwrap();

        assert_eq!(map.role(ControlId(17)), Some(ControlRole::Station(slot(1))));
        assert_eq!(map.role(ControlId(16)), Some(ControlRole::Station(slot(2))));
        assert_eq!(map.role(ControlId(26)), Some(ControlRole::Station(slot(3))));
        assert_eq!(map.role(ControlId(10)), Some(ControlRole::RotarySwitch));
        assert_eq!(map.role(ControlId(11)), None);
        assert_eq!(map.push_controls().count(), 4);
    }

    #[test]
    fn test_button_numbers() {
        let map = ControlMap::from_config(&GpioConfig::default()).unwrap();

        assert_eq!(map.button(2), Some(ControlId(16)));
        assert_eq!(map.button(ROTARY_SWITCH_BUTTON), Some(ControlId(10)));
        assert_eq!(map.button(0), None);
        assert_eq!(map.button(5), None);
    }

    #[tokio::test]
    async fn test_post_after_loop_stopped() {
        let (sender, rx) = InputSender::channel();
        drop(rx);
        assert!(matches!(
            sender.button(ControlId(17), true),
            Err(Error::ControlLoopClosed)
        ));
    }
}
