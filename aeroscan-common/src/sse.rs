//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE building blocks for AeroScan services.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::events::DemoEvent;

/// Interval between heartbeat comments
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create a heartbeat-only SSE stream for connection status monitoring
///
/// # Arguments
/// * `service_name` - Name of the service for logging (e.g., "aeroscan-demo")
pub fn create_heartbeat_sse_stream(
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} general events", service_name);

    let stream = async_stream::stream! {
        // Initial connected status
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            tokio::time::sleep(HEARTBEAT_INTERVAL).await;
            debug!("SSE: Sending heartbeat");
            yield Ok(Event::default().comment("heartbeat"));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

/// Convert a [`DemoEvent`] into an SSE frame (`event:` = event type, `data:` = JSON)
///
/// Returns `None` when the event cannot be serialized.
pub fn to_sse_event(event: &DemoEvent) -> Option<Event> {
    let event_type = event.event_type();
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event_type).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_to_sse_event_serializes() {
        let event = DemoEvent::SessionCreated {
            session_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        assert!(to_sse_event(&event).is_some());
    }
}
