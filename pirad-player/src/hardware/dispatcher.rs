//! Press gesture detection
//!
//! Turns raw press/release edges into [`ControlEvent`]s:
//!
//! - Station buttons report a `ShortPress` on every release.
//! - The rotary switch reports `LongPress` when held past the long-press
//!   threshold, `TriplePress` for three releases each within the press
//!   window of the previous one, and otherwise one `ShortPress` per release
//!   once the window has closed.
//!
//! Timers are spawned tasks that post an expiry input back into the control
//! loop. Each expiry carries the sequence number of the interaction that
//! started it, so a timer that lost the race against a release (or a newer
//! press) is recognised as stale and ignored.

use super::{ControlId, ControlMap, ControlRole, HardwareInput, InputSender};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Releases remembered for multi-press detection
const RELEASE_HISTORY: usize = 3;

/// Recognised press gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    ShortPress,
    LongPress,
    TriplePress,
}

/// Gesture on a specific control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub control: ControlId,
    pub role: ControlRole,
    pub gesture: Gesture,
}

/// Per-control press tracking
#[derive(Debug, Default)]
struct ControlState {
    is_pressed: bool,
    press_started_at: Option<Instant>,
    long_press_task: Option<JoinHandle<()>>,
    long_press_fired: bool,
    press_seq: u64,
    recent_releases: VecDeque<Instant>,
    window_task: Option<JoinHandle<()>>,
    release_seq: u64,
}

impl ControlState {
    fn cancel_long_press(&mut self) {
        if let Some(task) = self.long_press_task.take() {
            task.abort();
        }
    }

    fn cancel_window(&mut self) {
        if let Some(task) = self.window_task.take() {
            task.abort();
        }
    }
}

/// Gesture detector for all push controls
pub struct HardwareEventDispatcher {
    map: ControlMap,
    long_press: Duration,
    press_window: Duration,
    inputs: InputSender,
    states: HashMap<ControlId, ControlState>,
}

impl HardwareEventDispatcher {
    /// Create a dispatcher; `inputs` receives the timer expiries
    pub fn new(
        map: ControlMap,
        long_press: Duration,
        press_window: Duration,
        inputs: InputSender,
    ) -> Self {
        Self {
            map,
            long_press,
            press_window,
            inputs,
            states: HashMap::new(),
        }
    }

    /// Handle a press or release edge
    pub fn on_edge(&mut self, control: ControlId, pressed: bool, at: Instant) -> Vec<ControlEvent> {
        let Some(role) = self.map.role(control) else {
            warn!("Edge from unknown control {}, ignored", control);
            return Vec::new();
        };

        let state = self.states.entry(control).or_default();
        if state.is_pressed == pressed {
            debug!(%control, pressed, "Duplicate edge dropped");
            return Vec::new();
        }
        state.is_pressed = pressed;

        if pressed {
            Self::on_press(state, control, role, at, self.long_press, &self.inputs);
            Vec::new()
        } else {
            Self::on_release(
                state,
                control,
                role,
                at,
                self.long_press,
                self.press_window,
                &self.inputs,
            )
        }
    }

    fn on_press(
        state: &mut ControlState,
        control: ControlId,
        role: ControlRole,
        at: Instant,
        long_press: Duration,
        inputs: &InputSender,
    ) {
        debug!(%control, "Press");
        state.press_started_at = Some(at);
        state.press_seq += 1;

        if !role.detects_multi_press() {
            return;
        }

        state.long_press_fired = false;
        state.cancel_long_press();
        let seq = state.press_seq;
        let inputs = inputs.clone();
        let deadline = at + long_press;
        state.long_press_task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = inputs.post(HardwareInput::LongPressElapsed { control, seq });
        }));
    }

    fn on_release(
        state: &mut ControlState,
        control: ControlId,
        role: ControlRole,
        at: Instant,
        long_press: Duration,
        press_window: Duration,
        inputs: &InputSender,
    ) -> Vec<ControlEvent> {
        let held = state
            .press_started_at
            .take()
            .map(|start| at.saturating_duration_since(start));
        debug!(%control, ?held, "Release");

        if !role.detects_multi_press() {
            return vec![ControlEvent {
                control,
                role,
                gesture: Gesture::ShortPress,
            }];
        }

        state.cancel_long_press();
        if state.long_press_fired {
            // The long press already reported this interaction
            state.long_press_fired = false;
            return Vec::new();
        }

        // Edges can queue behind a slow operation, so the timer may not
        // have run yet; the edge timestamps decide
        if held.is_some_and(|held| held >= long_press) {
            state.recent_releases.clear();
            state.release_seq += 1;
            state.cancel_window();
            info!(%control, ?held, "Long press");
            return vec![ControlEvent {
                control,
                role,
                gesture: Gesture::LongPress,
            }];
        }

        let within_window = state
            .recent_releases
            .back()
            .is_some_and(|last| at.saturating_duration_since(*last) <= press_window);
        if !within_window {
            state.recent_releases.clear();
        }
        state.recent_releases.push_back(at);
        while state.recent_releases.len() > RELEASE_HISTORY {
            state.recent_releases.pop_front();
        }

        state.release_seq += 1;
        state.cancel_window();

        if state.recent_releases.len() == RELEASE_HISTORY {
            state.recent_releases.clear();
            info!(%control, "Triple press");
            return vec![ControlEvent {
                control,
                role,
                gesture: Gesture::TriplePress,
            }];
        }

        let seq = state.release_seq;
        let inputs = inputs.clone();
        state.window_task = Some(tokio::spawn(async move {
            tokio::time::sleep(press_window).await;
            let _ = inputs.post(HardwareInput::PressWindowElapsed { control, seq });
        }));
        Vec::new()
    }

    /// Handle a long-press timer expiry
    pub fn on_long_press_elapsed(&mut self, control: ControlId, seq: u64) -> Option<ControlEvent> {
        let role = self.map.role(control)?;
        let state = self.states.get_mut(&control)?;

        if !state.is_pressed || state.press_seq != seq || state.long_press_fired {
            debug!(%control, seq, "Stale long-press timer ignored");
            return None;
        }

        state.long_press_task = None;
        state.long_press_fired = true;
        state.recent_releases.clear();
        state.cancel_window();
        info!(%control, "Long press");
        Some(ControlEvent {
            control,
            role,
            gesture: Gesture::LongPress,
        })
    }

    /// Handle the close of a multi-press window
    ///
    /// Releases that did not add up to a triple press become short presses.
    pub fn on_press_window_elapsed(&mut self, control: ControlId, seq: u64) -> Vec<ControlEvent> {
        let Some(role) = self.map.role(control) else {
            return Vec::new();
        };
        let Some(state) = self.states.get_mut(&control) else {
            return Vec::new();
        };

        if state.release_seq != seq {
            debug!(%control, seq, "Stale press window ignored");
            return Vec::new();
        }

        state.window_task = None;
        let pending = state.recent_releases.len();
        state.recent_releases.clear();
        (0..pending)
            .map(|_| ControlEvent {
                control,
                role,
                gesture: Gesture::ShortPress,
            })
            .collect()
    }
}

impl Drop for HardwareEventDispatcher {
    fn drop(&mut self) {
        for state in self.states.values_mut() {
            state.cancel_long_press();
            state.cancel_window();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GpioConfig;
    use pirad_common::Slot;
    use tokio::sync::mpsc::UnboundedReceiver;

    const STATION_1: ControlId = ControlId(17);
    const SWITCH: ControlId = ControlId(10);

    fn setup() -> (HardwareEventDispatcher, UnboundedReceiver<HardwareInput>) {
        let map = ControlMap::from_config(&GpioConfig::default()).unwrap();
        let (inputs, rx) = InputSender::channel();
        let dispatcher = HardwareEventDispatcher::new(
            map,
            Duration::from_secs(3),
            Duration::from_millis(500),
            inputs,
        );
        (dispatcher, rx)
    }

    /// Feed timer expiries back into the dispatcher, like the control loop does
    fn deliver(dispatcher: &mut HardwareEventDispatcher, input: HardwareInput) -> Vec<ControlEvent> {
        match input {
            HardwareInput::LongPressElapsed { control, seq } => {
                dispatcher.on_long_press_elapsed(control, seq).into_iter().collect()
            }
            HardwareInput::PressWindowElapsed { control, seq } => {
                dispatcher.on_press_window_elapsed(control, seq)
            }
            other => panic!("unexpected input {:?}", other),
        }
    }

    fn is_pressed(dispatcher: &HardwareEventDispatcher, control: ControlId) -> bool {
        dispatcher.states.get(&control).is_some_and(|s| s.is_pressed)
    }

    /// Let every timer due up to `d` from now post its expiry and deliver it
    async fn run_timers(
        dispatcher: &mut HardwareEventDispatcher,
        rx: &mut UnboundedReceiver<HardwareInput>,
        d: Duration,
    ) -> Vec<ControlEvent> {
        tokio::time::sleep(d).await;
        let mut events = Vec::new();
        while let Ok(input) = rx.try_recv() {
            events.extend(deliver(dispatcher, input));
        }
        events
    }

    fn gestures(events: &[ControlEvent]) -> Vec<Gesture> {
        events.iter().map(|e| e.gesture).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_station_button_short_press_is_immediate() {
        let (mut dispatcher, mut rx) = setup();

        assert!(dispatcher.on_edge(STATION_1, true, Instant::now()).is_empty());
        tokio::time::advance(Duration::from_millis(100)).await;
        let events = dispatcher.on_edge(STATION_1, false, Instant::now());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::ShortPress);
        assert_eq!(
            events[0].role,
            ControlRole::Station(Slot::try_from(1).unwrap())
        );

        // Station buttons never report long presses
        assert!(run_timers(&mut dispatcher, &mut rx, Duration::from_secs(5)).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_short_press() {
        let (mut dispatcher, mut rx) = setup();

        dispatcher.on_edge(SWITCH, true, Instant::now());
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(dispatcher.on_edge(SWITCH, false, Instant::now()).is_empty());

        let events = run_timers(&mut dispatcher, &mut rx, Duration::from_secs(4)).await;
        assert_eq!(gestures(&events), vec![Gesture::ShortPress]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_long_press_reports_once() {
        let (mut dispatcher, mut rx) = setup();

        dispatcher.on_edge(SWITCH, true, Instant::now());
        let events = run_timers(&mut dispatcher, &mut rx, Duration::from_millis(3100)).await;
        assert_eq!(gestures(&events), vec![Gesture::LongPress]);
        assert!(is_pressed(&dispatcher, SWITCH));

        // Release after the long press adds nothing
        assert!(dispatcher.on_edge(SWITCH, false, Instant::now()).is_empty());
        assert!(run_timers(&mut dispatcher, &mut rx, Duration::from_secs(2)).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_hold_delivered_late_is_long_press() {
        let (mut dispatcher, mut rx) = setup();
        let t0 = Instant::now();

        // Both edges reach the dispatcher back to back, after the hold ended
        dispatcher.on_edge(SWITCH, true, t0);
        let mut events = dispatcher.on_edge(SWITCH, false, t0 + Duration::from_secs(4));
        events.extend(run_timers(&mut dispatcher, &mut rx, Duration::from_secs(5)).await);

        assert_eq!(gestures(&events), vec![Gesture::LongPress]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_timer_counts_from_press_edge() {
        let (mut dispatcher, mut rx) = setup();
        let t0 = Instant::now();

        // Press edge handled 2s after it happened
        tokio::time::advance(Duration::from_secs(2)).await;
        dispatcher.on_edge(SWITCH, true, t0);
        let events = run_timers(&mut dispatcher, &mut rx, Duration::from_millis(1100)).await;
        assert_eq!(gestures(&events), vec![Gesture::LongPress]);

        assert!(dispatcher.on_edge(SWITCH, false, Instant::now()).is_empty());
        assert!(run_timers(&mut dispatcher, &mut rx, Duration::from_secs(2)).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_hold_does_not_count_toward_triple() {
        let (mut dispatcher, mut rx) = setup();
        let mut events = Vec::new();

        for _ in 0..2 {
            let t = Instant::now();
            dispatcher.on_edge(SWITCH, true, t);
            events.extend(dispatcher.on_edge(SWITCH, false, t + Duration::from_millis(50)));
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        let t = Instant::now();
        dispatcher.on_edge(SWITCH, true, t);
        events.extend(dispatcher.on_edge(SWITCH, false, t + Duration::from_secs(3)));
        events.extend(run_timers(&mut dispatcher, &mut rx, Duration::from_secs(5)).await);

        assert_eq!(gestures(&events), vec![Gesture::LongPress]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_triple_press() {
        let (mut dispatcher, mut rx) = setup();
        let mut events = Vec::new();

        for _ in 0..3 {
            dispatcher.on_edge(SWITCH, true, Instant::now());
            tokio::time::advance(Duration::from_millis(80)).await;
            events.extend(dispatcher.on_edge(SWITCH, false, Instant::now()));
            tokio::time::advance(Duration::from_millis(150)).await;
        }
        events.extend(run_timers(&mut dispatcher, &mut rx, Duration::from_secs(4)).await);

        assert_eq!(gestures(&events), vec![Gesture::TriplePress]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_after_triple_starts_fresh_count() {
        let (mut dispatcher, mut rx) = setup();

        for _ in 0..3 {
            dispatcher.on_edge(SWITCH, true, Instant::now());
            dispatcher.on_edge(SWITCH, false, Instant::now());
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        dispatcher.on_edge(SWITCH, true, Instant::now());
        assert!(dispatcher.on_edge(SWITCH, false, Instant::now()).is_empty());
        let events = run_timers(&mut dispatcher, &mut rx, Duration::from_secs(1)).await;
        assert_eq!(gestures(&events), vec![Gesture::ShortPress]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_presses_are_separate_short_presses() {
        let (mut dispatcher, mut rx) = setup();
        let mut events = Vec::new();

        for _ in 0..3 {
            dispatcher.on_edge(SWITCH, true, Instant::now());
            dispatcher.on_edge(SWITCH, false, Instant::now());
            events.extend(run_timers(&mut dispatcher, &mut rx, Duration::from_millis(700)).await);
        }

        assert_eq!(gestures(&events), vec![Gesture::ShortPress; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_quick_presses_flush_as_two_short_presses() {
        let (mut dispatcher, mut rx) = setup();

        for _ in 0..2 {
            dispatcher.on_edge(SWITCH, true, Instant::now());
            dispatcher.on_edge(SWITCH, false, Instant::now());
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        let events = run_timers(&mut dispatcher, &mut rx, Duration::from_secs(1)).await;
        assert_eq!(gestures(&events), vec![Gesture::ShortPress; 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_edges_dropped() {
        let (mut dispatcher, _rx) = setup();

        assert!(dispatcher.on_edge(STATION_1, false, Instant::now()).is_empty());
        dispatcher.on_edge(STATION_1, true, Instant::now());
        dispatcher.on_edge(STATION_1, true, Instant::now());
        assert_eq!(dispatcher.on_edge(STATION_1, false, Instant::now()).len(), 1);
        assert!(dispatcher.on_edge(STATION_1, false, Instant::now()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_control_ignored() {
        let (mut dispatcher, _rx) = setup();
        assert!(dispatcher.on_edge(ControlId(2), true, Instant::now()).is_empty());
        assert!(dispatcher.on_edge(ControlId(2), false, Instant::now()).is_empty());
        assert!(!is_pressed(&dispatcher, ControlId(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_long_press_expiry_ignored() {
        let (mut dispatcher, _rx) = setup();

        dispatcher.on_edge(SWITCH, true, Instant::now());
        dispatcher.on_edge(SWITCH, false, Instant::now());
        dispatcher.on_edge(SWITCH, true, Instant::now());

        // Expiry from the first interaction arrives while the second is held
        assert!(dispatcher.on_long_press_elapsed(SWITCH, 1).is_none());
        assert!(dispatcher.on_long_press_elapsed(SWITCH, 2).is_some());
        assert!(dispatcher.on_long_press_elapsed(SWITCH, 2).is_none());
    }
}
