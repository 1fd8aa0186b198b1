//! Control loop
//!
//! One task consumes every [`HardwareInput`] (real GPIO edges, simulated
//! presses and timer expiries alike), turns them into gestures and volume
//! steps, and applies them to the orchestrator. Inputs are handled strictly
//! one after another, so an orchestrator call triggered by a gesture has
//! finished before the next input is looked at.

use crate::config::{ActionsConfig, ControlsConfig};
use crate::error::{Error, Result};
use crate::hardware::dispatcher::{ControlEvent, Gesture, HardwareEventDispatcher};
use crate::hardware::rotary::RotaryDecoder;
use crate::hardware::{ControlMap, ControlRole, HardwareInput, InputSender, Level};
use crate::playback::PlaybackOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Largest volume change accepted by [`ControlHandle::simulate_volume_change`]
pub const MAX_SIMULATED_VOLUME_DELTA: i32 = 50;

/// Consumer of the hardware input channel
pub struct ControlLoop {
    dispatcher: HardwareEventDispatcher,
    decoder: RotaryDecoder,
    orchestrator: Arc<PlaybackOrchestrator>,
    actions: ActionsConfig,
    rx: UnboundedReceiver<HardwareInput>,
}

impl ControlLoop {
    /// Spawn the loop task
    ///
    /// The dispatcher keeps a sender for its timers, so the task runs until
    /// it is aborted through the returned `JoinHandle`.
    pub fn spawn(
        controls: &ControlsConfig,
        actions: ActionsConfig,
        map: ControlMap,
        orchestrator: Arc<PlaybackOrchestrator>,
    ) -> (ControlHandle, JoinHandle<()>) {
        let (inputs, rx) = InputSender::channel();

        let decoder = RotaryDecoder::new(
            controls.rotary_volume_step,
            controls.rotary_clockwise_increases,
            controls.rotary_debounce(),
        );
        let handle = ControlHandle {
            inputs: inputs.clone(),
            map: Arc::new(map.clone()),
            rotary_step: decoder.volume_step(),
            rotary_debounce: decoder.debounce(),
            increase_data_level: decoder.data_level_for(true),
            decrease_data_level: decoder.data_level_for(false),
        };

        let control_loop = ControlLoop {
            dispatcher: HardwareEventDispatcher::new(
                map,
                controls.long_press(),
                controls.triple_press_window(),
                inputs,
            ),
            decoder,
            orchestrator,
            actions,
            rx,
        };

        (handle, tokio::spawn(control_loop.run()))
    }

    async fn run(mut self) {
        info!("Control loop started");
        while let Some(input) = self.rx.recv().await {
            self.handle(input).await;
        }
        info!("Control loop stopped");
    }

    async fn handle(&mut self, input: HardwareInput) {
        match input {
            HardwareInput::Button {
                control,
                pressed,
                at,
            } => {
                let events = self.dispatcher.on_edge(control, pressed, at);
                self.perform_all(events).await;
            }
            HardwareInput::Rotary { clock, data, at } => {
                if let Some(delta) = self.decoder.on_edge(clock, data, at) {
                    self.orchestrator.adjust_volume(delta).await;
                }
            }
            HardwareInput::LongPressElapsed { control, seq } => {
                if let Some(event) = self.dispatcher.on_long_press_elapsed(control, seq) {
                    self.perform(event).await;
                }
            }
            HardwareInput::PressWindowElapsed { control, seq } => {
                let events = self.dispatcher.on_press_window_elapsed(control, seq);
                self.perform_all(events).await;
            }
            HardwareInput::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    async fn perform_all(&self, events: Vec<ControlEvent>) {
        for event in events {
            self.perform(event).await;
        }
    }

    async fn perform(&self, event: ControlEvent) {
        match (event.role, event.gesture) {
            (ControlRole::Station(slot), Gesture::ShortPress) => {
                self.orchestrator.toggle(slot).await;
            }
            (ControlRole::Station(slot), gesture) => {
                debug!("Ignoring {:?} on station button {}", gesture, slot);
            }
            (ControlRole::RotarySwitch, Gesture::ShortPress) => {
                info!("Rotary switch short press (no action bound)");
            }
            (ControlRole::RotarySwitch, Gesture::LongPress) => {
                run_action("long press", self.actions.long_press.as_deref());
            }
            (ControlRole::RotarySwitch, Gesture::TriplePress) => {
                self.orchestrator.stop().await;
                run_action("triple press", self.actions.triple_press.as_deref());
            }
        }
    }
}

/// Run a configured gesture command in the background
fn run_action(gesture: &'static str, argv: Option<&[String]>) {
    let Some((program, args)) = argv.and_then(|argv| argv.split_first()) else {
        info!("No command configured for {}", gesture);
        return;
    };

    let mut command = Command::new(program);
    command.args(args);
    let program = program.clone();
    info!("Running {} command: {}", gesture, program);

    tokio::spawn(async move {
        match command.status().await {
            Ok(status) if status.success() => debug!("{} command finished", gesture),
            Ok(status) => warn!("{} command {} exited with {}", gesture, program, status),
            Err(e) => error!("{} command {} failed to run: {}", gesture, program, e),
        }
    });
}

/// Cloneable entry point for simulated input
#[derive(Debug, Clone)]
pub struct ControlHandle {
    inputs: InputSender,
    map: Arc<ControlMap>,
    rotary_step: i32,
    rotary_debounce: Duration,
    increase_data_level: Level,
    decrease_data_level: Level,
}

impl ControlHandle {
    /// Sender for edge sources
    pub fn inputs(&self) -> InputSender {
        self.inputs.clone()
    }

    /// Press and release a button, then wait until the loop has handled it
    ///
    /// Buttons 1-3 are the station buttons, 4 is the rotary switch.
    pub async fn simulate_button_press(&self, button: u8) -> Result<()> {
        let control = self
            .map
            .button(button)
            .ok_or_else(|| Error::InvalidInput(format!("unknown button {}", button)))?;

        info!("Simulating press of button {} ({})", button, control);
        self.inputs.button(control, true)?;
        self.inputs.button(control, false)?;
        self.inputs.flush().await
    }

    /// Turn the encoder far enough to change the volume by about `delta`
    ///
    /// Posts one detent per volume step (at least one), spaced by the
    /// debounce interval, then waits until the loop has handled them.
    pub async fn simulate_volume_change(&self, delta: i32) -> Result<()> {
        if delta == 0 || delta.abs() > MAX_SIMULATED_VOLUME_DELTA {
            return Err(Error::InvalidInput(format!(
                "volume change must be between -{max} and {max} and not 0, got {delta}",
                max = MAX_SIMULATED_VOLUME_DELTA
            )));
        }

        let detents = (delta.abs() / self.rotary_step).max(1);
        let data = if delta > 0 {
            self.increase_data_level
        } else {
            self.decrease_data_level
        };

        info!("Simulating {} rotary detent(s) for delta {}", detents, delta);
        for _ in 0..detents {
            tokio::time::sleep(self.rotary_debounce).await;
            self.inputs.rotary(Level::High, data)?;
        }
        self.inputs.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockBackend;
    use crate::config::GpioConfig;
    use crate::hardware::ControlId;
    use crate::playback::{EventBusSink, MemoryStations};
    use pirad_common::{EventBus, PlaybackState, Slot, Station};

    fn slot(n: u8) -> Slot {
        Slot::try_from(n).unwrap()
    }

    fn setup() -> (ControlHandle, Arc<PlaybackOrchestrator>) {
        let stations = MemoryStations::new()
            .with(slot(1), Station::new("One", "http://one.example.com"))
            .with(slot(2), Station::new("Two", "http://two.example.com"));
        let orchestrator = Arc::new(PlaybackOrchestrator::new(
            Box::new(MockBackend::new(Duration::from_millis(20))),
            Arc::new(stations),
            Arc::new(EventBusSink::new(Arc::new(EventBus::new(16)))),
            50,
        ));
        let map = ControlMap::from_config(&GpioConfig::default()).unwrap();
        let (handle, _task) = ControlLoop::spawn(
            &ControlsConfig::default(),
            ActionsConfig::default(),
            map,
            Arc::clone(&orchestrator),
        );
        (handle, orchestrator)
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_station_press_toggles() {
        let (controls, orchestrator) = setup();

        controls.simulate_button_press(1).await.unwrap();
        let status = orchestrator.get_status();
        assert!(status.is_playing_slot(slot(1)));

        controls.simulate_button_press(1).await.unwrap();
        assert_eq!(orchestrator.get_status().playback_state, PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_button_rejected() {
        let (controls, _orchestrator) = setup();
        assert!(matches!(
            controls.simulate_button_press(9).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_volume_change() {
        let (controls, orchestrator) = setup();

        controls.simulate_volume_change(10).await.unwrap();
        assert_eq!(orchestrator.get_status().volume, 60);

        controls.simulate_volume_change(-3).await.unwrap();
        assert_eq!(orchestrator.get_status().volume, 55);

        assert!(controls.simulate_volume_change(0).await.is_err());
        assert!(controls.simulate_volume_change(51).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_triple_press_stops_playback() {
        let (controls, orchestrator) = setup();
        controls.simulate_button_press(2).await.unwrap();
        assert!(orchestrator.get_status().is_playing);

        let inputs = controls.inputs();
        let switch = ControlId(10);
        for _ in 0..3 {
            inputs.button(switch, true).unwrap();
            inputs.button(switch, false).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        inputs.flush().await.unwrap();

        assert_eq!(orchestrator.get_status().playback_state, PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_keeps_playback() {
        let (controls, orchestrator) = setup();
        controls.simulate_button_press(1).await.unwrap();

        let inputs = controls.inputs();
        inputs.button(ControlId(10), true).unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;
        inputs.button(ControlId(10), false).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        inputs.flush().await.unwrap();

        assert!(orchestrator.get_status().is_playing_slot(slot(1)));
    }
}
