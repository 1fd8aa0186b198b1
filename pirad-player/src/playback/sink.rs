//! Status notification sinks

use crate::error::Result;
use async_trait::async_trait;
use pirad_common::{EventBus, StatusEventType, StatusUpdate, SystemStatus};
use std::sync::Arc;
use tracing::trace;

/// Receiver of status changes
///
/// The orchestrator logs a failed notification and carries on.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn notify(&self, event_type: StatusEventType, status: &SystemStatus) -> Result<()>;
}

/// Publishes status changes on the shared [`EventBus`]
#[derive(Debug, Clone)]
pub struct EventBusSink {
    bus: Arc<EventBus>,
}

impl EventBusSink {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl StatusSink for EventBusSink {
    async fn notify(&self, event_type: StatusEventType, status: &SystemStatus) -> Result<()> {
        // No subscribers is normal when nobody has the web UI open
        match self.bus.emit(StatusUpdate::new(event_type, status.clone())) {
            Ok(receivers) => trace!(%event_type, receivers, "Status published"),
            Err(_) => trace!(%event_type, "Status published without subscribers"),
        }
        Ok(())
    }
}
