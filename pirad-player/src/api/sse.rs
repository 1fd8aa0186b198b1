//! Server-Sent Events status stream
//!
//! Every client first gets a `system_status` event with the current status,
//! then one event per status change. The SSE event name is the update type.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use pirad_common::{StatusEventType, StatusUpdate};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events - SSE status stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before taking the snapshot so no change falls in between
    let rx = ctx.events.subscribe();
    debug!("New SSE client connected ({} subscribers)", ctx.events.subscriber_count());
    let initial = StatusUpdate::new(StatusEventType::SystemStatus, ctx.orchestrator.get_status());

    let updates = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(update) => Some(update),
            Err(e) => {
                // Lagged: the next update carries the full status anyway
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    let stream = stream::once(async move { initial })
        .chain(updates)
        .filter_map(|update| async move { to_event(&update).map(Ok::<_, Infallible>) });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(update: &StatusUpdate) -> Option<Event> {
    match serde_json::to_string(update) {
        Ok(json) => Some(Event::default().event(update.event_type.as_str()).data(json)),
        Err(e) => {
            warn!("Failed to serialize status update: {}", e);
            None
        }
    }
}
