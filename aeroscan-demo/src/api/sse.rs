//! Server-Sent Events (SSE) streams
//!
//! `/events` is a heartbeat-only stream used by pages for connection
//! status. `/api/sessions/:id/events` forwards the event bus, filtered to
//! one session.

use std::convert::Infallible;

use aeroscan_common::sse::{create_heartbeat_sse_stream, to_sse_event, HEARTBEAT_INTERVAL};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{error::ApiResult, AppState};

/// GET /events
pub async fn event_stream() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    create_heartbeat_sse_stream("aeroscan-demo")
}

/// GET /api/sessions/:id/events
///
/// Streams StepChanged, ProcessingPhaseStarted, ProcessingCompleted and the
/// other events of this session. Ends once the session is ended.
pub async fn session_event_stream(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before checking so nothing emitted in between is lost
    let mut rx = state.event_bus.subscribe();
    state.sessions.get(session_id).await?;
    info!(session_id = %session_id, "New SSE client connected to session events");

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.session_id() == session_id => {
                    let ended = matches!(event, aeroscan_common::events::DemoEvent::SessionEnded { .. });
                    if let Some(frame) = to_sse_event(&event) {
                        debug!(session_id = %session_id, event = event.event_type(), "SSE: forwarding event");
                        yield Ok(frame);
                    }
                    if ended {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session_id = %session_id, skipped, "SSE: client lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(session_id = %session_id, "SSE: session event stream ended");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    ))
}
