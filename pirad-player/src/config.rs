//! Configuration management for pirad-player
//!
//! All settings come from one TOML file (see `pirad_common::config` for how
//! the file is located). Every field has a built-in default, so a missing
//! file or a partial file is fine. Command-line arguments override the few
//! settings that are useful to change per run (port, mock mode, stations file).
//!
//! ```toml
//! port = 8000
//! stations_file = "/var/lib/pirad/stations.json"
//! mock_hardware = false
//!
//! [logging]
//! level = "info"
//!
//! [audio]
//! default_volume = 50
//! min_volume = 30
//!
//! [controls]
//! long_press_ms = 3000
//! triple_press_window_ms = 500
//! rotary_debounce_ms = 10
//! rotary_volume_step = 5
//! rotary_clockwise_increases = true
//!
//! [gpio]
//! station_pins = [17, 16, 26]
//! rotary_clk = 11
//! rotary_dt = 9
//! rotary_sw = 10
//!
//! [actions]
//! long_press = ["/usr/local/bin/pirad-toggle-mode"]
//! triple_press = ["sudo", "reboot"]
//! ```

use crate::error::{Error, Result};
use pirad_common::config::{load_toml, resolve_config_file, CONFIG_ENV_VAR};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete player configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// HTTP server port
    pub port: u16,

    /// JSON file with the three station slots
    pub stations_file: PathBuf,

    /// Skip GPIO and mpv entirely and use simulated drivers
    pub mock_hardware: bool,

    pub logging: LoggingConfig,
    pub audio: AudioConfig,
    pub controls: ControlsConfig,
    pub gpio: GpioConfig,
    pub actions: ActionsConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            stations_file: PathBuf::from("/var/lib/pirad/stations.json"),
            mock_hardware: false,
            logging: LoggingConfig::default(),
            audio: AudioConfig::default(),
            controls: ControlsConfig::default(),
            gpio: GpioConfig::default(),
            actions: ActionsConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Audio output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Volume applied at startup (0-100)
    pub default_volume: u8,

    /// Lowest non-zero volume the HTTP API will set
    pub min_volume: u8,

    /// mpv executable
    pub mpv_binary: PathBuf,

    /// mpv JSON IPC socket path
    pub ipc_socket: PathBuf,

    /// How long mpv must stay alive before a stream counts as started
    pub start_grace_ms: u64,

    /// Simulated backend latency in mock mode
    pub mock_latency_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            default_volume: 50,
            min_volume: 30,
            mpv_binary: PathBuf::from("mpv"),
            ipc_socket: PathBuf::from("/tmp/pirad-mpv.sock"),
            start_grace_ms: 500,
            mock_latency_ms: 20,
        }
    }
}

impl AudioConfig {
    pub fn start_grace(&self) -> Duration {
        Duration::from_millis(self.start_grace_ms)
    }

    pub fn mock_latency(&self) -> Duration {
        Duration::from_millis(self.mock_latency_ms)
    }
}

/// Press and rotary timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Hold time before the rotary switch reports a long press
    pub long_press_ms: u64,

    /// Maximum gap between releases counted towards a triple press
    pub triple_press_window_ms: u64,

    /// Minimum gap between accepted rotary steps
    pub rotary_debounce_ms: u64,

    /// Volume change per rotary detent
    pub rotary_volume_step: u8,

    /// Clockwise rotation raises the volume
    pub rotary_clockwise_increases: bool,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 3000,
            triple_press_window_ms: 500,
            rotary_debounce_ms: 10,
            rotary_volume_step: 5,
            rotary_clockwise_increases: true,
        }
    }
}

impl ControlsConfig {
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn triple_press_window(&self) -> Duration {
        Duration::from_millis(self.triple_press_window_ms)
    }

    pub fn rotary_debounce(&self) -> Duration {
        Duration::from_millis(self.rotary_debounce_ms)
    }
}

/// BCM pin numbers of the physical controls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// Station buttons for slots 1, 2 and 3
    pub station_pins: Vec<u8>,

    /// Rotary encoder clock pin
    pub rotary_clk: u8,

    /// Rotary encoder data pin
    pub rotary_dt: u8,

    /// Rotary encoder push switch
    pub rotary_sw: u8,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            station_pins: vec![17, 16, 26],
            rotary_clk: 11,
            rotary_dt: 9,
            rotary_sw: 10,
        }
    }
}

/// External commands bound to rotary switch gestures
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// argv run on a long press of the rotary switch
    pub long_press: Option<Vec<String>>,

    /// argv run on a triple press of the rotary switch (after stopping playback)
    pub triple_press: Option<Vec<String>>,
}

impl PlayerConfig {
    /// Locate, load and validate the config file
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let location = resolve_config_file(cli_path, CONFIG_ENV_VAR);
        let config: PlayerConfig = load_toml(location.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the player cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.audio.default_volume > 100 {
            return Err(Error::Config(format!(
                "audio.default_volume must be 0-100, got {}",
                self.audio.default_volume
            )));
        }
        if self.audio.min_volume > 100 {
            return Err(Error::Config(format!(
                "audio.min_volume must be 0-100, got {}",
                self.audio.min_volume
            )));
        }
        if self.controls.rotary_volume_step == 0 {
            return Err(Error::Config(
                "controls.rotary_volume_step must be greater than 0".to_string(),
            ));
        }
        if self.controls.long_press_ms == 0 || self.controls.triple_press_window_ms == 0 {
            return Err(Error::Config(
                "press timings must be greater than 0".to_string(),
            ));
        }
        if self.gpio.station_pins.len() != 3 {
            return Err(Error::Config(format!(
                "gpio.station_pins must list exactly 3 pins, got {}",
                self.gpio.station_pins.len()
            )));
        }

        let mut seen = HashSet::new();
        let all_pins = self.gpio.station_pins.iter().copied().chain([
            self.gpio.rotary_clk,
            self.gpio.rotary_dt,
            self.gpio.rotary_sw,
        ]);
        for pin in all_pins {
            if !seen.insert(pin) {
                return Err(Error::Config(format!("GPIO pin {} assigned twice", pin)));
            }
        }

        for (name, action) in [
            ("actions.long_press", &self.actions.long_press),
            ("actions.triple_press", &self.actions.triple_press),
        ] {
            if matches!(action, Some(argv) if argv.is_empty()) {
                return Err(Error::Config(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.controls.long_press(), Duration::from_secs(3));
        assert_eq!(config.controls.triple_press_window(), Duration::from_millis(500));
        assert_eq!(config.controls.rotary_debounce(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PlayerConfig = toml::from_str(
            r#"
            port = 9000

            [controls]
            rotary_volume_step = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.controls.rotary_volume_step, 2);
        assert_eq!(config.controls.long_press_ms, 3000);
        assert_eq!(config.gpio.station_pins, vec![17, 16, 26]);
        assert!(config.actions.long_press.is_none());
    }

    #[test]
    fn test_duplicate_pins_rejected() {
        let mut config = PlayerConfig::default();
        config.gpio.rotary_sw = 17;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_out_of_range_volume_rejected() {
        let mut config = PlayerConfig::default();
        config.audio.default_volume = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_station_pin_count_enforced() {
        let mut config = PlayerConfig::default();
        config.gpio.station_pins = vec![17, 16];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_action_rejected() {
        let mut config = PlayerConfig::default();
        config.actions.triple_press = Some(Vec::new());
        assert!(config.validate().is_err());
    }
}
