//! Raspberry Pi GPIO edge source
//!
//! Buttons are wired active-low with the internal pull-ups enabled, so a
//! falling edge is a press. Interrupt callbacks run on rppal's interrupt
//! thread and only post to the [`InputSender`].

use super::source::EdgeSource;
use super::{ControlId, ControlMap, InputSender, Level};
use crate::error::{Error, Result};
use rppal::gpio::{Event, Gpio, InputPin, Trigger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Contact bounce filter for the push buttons
const BUTTON_DEBOUNCE: Duration = Duration::from_millis(20);

/// Interrupt-driven source for buttons and the rotary encoder
pub struct GpioEdgeSource {
    // Held so the interrupts stay registered
    _pins: Vec<InputPin>,
}

fn unavailable(what: &str, e: rppal::gpio::Error) -> Error {
    Error::HardwareUnavailable(format!("{}: {}", what, e))
}

fn input_pin(gpio: &Gpio, control: ControlId) -> Result<InputPin> {
    gpio.get(control.0)
        .map(|pin| pin.into_input_pullup())
        .map_err(|e| unavailable(&format!("cannot claim {}", control), e))
}

impl GpioEdgeSource {
    /// Claim all pins and register their interrupts
    pub fn open(map: &ControlMap, rotary_debounce: Duration, inputs: InputSender) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| unavailable("GPIO not available", e))?;
        let mut pins = Vec::new();

        for (control, role) in map.push_controls() {
            let mut pin = input_pin(&gpio, control)?;
            let inputs = inputs.clone();
            pin.set_async_interrupt(Trigger::Both, Some(BUTTON_DEBOUNCE), move |event: Event| {
                let pressed = event.trigger == Trigger::FallingEdge;
                let _ = inputs.button(control, pressed);
            })
            .map_err(|e| unavailable(&format!("cannot watch {}", control), e))?;
            debug!(%control, ?role, "Watching push control");
            pins.push(pin);
        }

        // The data line is tracked by its own interrupt and sampled on clock edges
        let mut dt_pin = input_pin(&gpio, map.rotary_dt())?;
        let data_high = Arc::new(AtomicBool::new(dt_pin.is_high()));
        {
            let data_high = Arc::clone(&data_high);
            dt_pin
                .set_async_interrupt(Trigger::Both, None, move |event: Event| {
                    data_high.store(event.trigger == Trigger::RisingEdge, Ordering::Relaxed);
                })
                .map_err(|e| unavailable("cannot watch rotary data line", e))?;
        }
        pins.push(dt_pin);

        let mut clk_pin = input_pin(&gpio, map.rotary_clk())?;
        let inputs = inputs.clone();
        clk_pin
            .set_async_interrupt(Trigger::Both, Some(rotary_debounce), move |event: Event| {
                let clock = Level::from(event.trigger == Trigger::RisingEdge);
                let data = Level::from(data_high.load(Ordering::Relaxed));
                let _ = inputs.rotary(clock, data);
            })
            .map_err(|e| unavailable("cannot watch rotary clock line", e))?;
        pins.push(clk_pin);

        Ok(Self { _pins: pins })
    }
}

impl EdgeSource for GpioEdgeSource {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn is_hardware(&self) -> bool {
        true
    }
}
