//! Event types for the pirad status stream
//!
//! Provides the status update event and the EventBus used to fan it out to
//! HTTP/SSE subscribers.

mod playback_types;

pub use playback_types::{PlaybackState, Slot, SystemStatus};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Kind of status change being announced
///
/// Serialized in snake_case (`playback_status`, `volume_update`,
/// `system_status`); the SSE stream uses the same string as event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEventType {
    /// Playback state or current slot changed
    PlaybackStatus,
    /// Volume changed
    VolumeUpdate,
    /// Full status refresh (initial state for new subscribers)
    SystemStatus,
}

impl StatusEventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusEventType::PlaybackStatus => "playback_status",
            StatusEventType::VolumeUpdate => "volume_update",
            StatusEventType::SystemStatus => "system_status",
        }
    }
}

impl std::fmt::Display for StatusEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status change notification
///
/// Carries a full snapshot so subscribers never need to merge partial
/// updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Why this update was sent
    #[serde(rename = "type")]
    pub event_type: StatusEventType,
    /// Status snapshot at the time of the change
    pub data: SystemStatus,
    /// When the update was produced
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StatusUpdate {
    /// Create an update stamped with the current time
    pub fn new(event_type: StatusEventType, data: SystemStatus) -> Self {
        Self {
            event_type,
            data,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and
/// lose the oldest events rather than blocking the sender.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<StatusUpdate>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use pirad_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StatusUpdate,
    ) -> Result<usize, broadcast::error::SendError<StatusUpdate>> {
        self.tx.send(event)
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
