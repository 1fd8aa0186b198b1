//! Edge sources
//!
//! An edge source feeds physical control edges into an [`InputSender`].
//! The real one watches GPIO interrupts (feature `gpio`); the null one is
//! used in mock mode and whenever GPIO cannot be opened, in which case the
//! simulation API is the only input.

use super::{ControlMap, InputSender};
use tracing::{info, warn};

/// Producer of hardware edges, kept alive for as long as input is wanted
///
/// Dropping the source releases its interrupts.
pub trait EdgeSource: Send {
    /// Short name for logs and the hardware info endpoint
    fn name(&self) -> &'static str;

    /// True when edges come from real hardware
    fn is_hardware(&self) -> bool;
}

/// Source that never produces edges
#[derive(Debug, Default)]
pub struct NullEdgeSource;

impl EdgeSource for NullEdgeSource {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_hardware(&self) -> bool {
        false
    }
}

/// Open the GPIO edge source, falling back to [`NullEdgeSource`]
pub fn open_edge_source(
    mock_hardware: bool,
    map: &ControlMap,
    debounce: std::time::Duration,
    inputs: InputSender,
) -> Box<dyn EdgeSource> {
    if mock_hardware {
        info!("Mock hardware mode: GPIO disabled, use the simulation API for input");
        return Box::new(NullEdgeSource);
    }

    open_gpio(map, debounce, inputs)
}

#[cfg(feature = "gpio")]
fn open_gpio(
    map: &ControlMap,
    debounce: std::time::Duration,
    inputs: InputSender,
) -> Box<dyn EdgeSource> {
    match super::gpio::GpioEdgeSource::open(map, debounce, inputs) {
        Ok(source) => {
            info!("GPIO edge source ready");
            Box::new(source)
        }
        Err(e) => {
            warn!("{}; continuing without hardware controls", e);
            Box::new(NullEdgeSource)
        }
    }
}

#[cfg(not(feature = "gpio"))]
fn open_gpio(
    _map: &ControlMap,
    _debounce: std::time::Duration,
    _inputs: InputSender,
) -> Box<dyn EdgeSource> {
    warn!("Built without the `gpio` feature; continuing without hardware controls");
    Box::new(NullEdgeSource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GpioConfig;
    use std::time::Duration;

    #[test]
    fn test_mock_mode_uses_null_source() {
        let map = ControlMap::from_config(&GpioConfig::default()).unwrap();
        let (inputs, _rx) = InputSender::channel();

        let source = open_edge_source(true, &map, Duration::from_millis(10), inputs);
        assert_eq!(source.name(), "none");
        assert!(!source.is_hardware());
    }
}
