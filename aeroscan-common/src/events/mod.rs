//! Event types for the AeroScan event system
//!
//! Provides the shared event definitions and the EventBus used to fan
//! session activity out to SSE clients.

mod processing_types;

pub use processing_types::{KeyMetric, PhaseProgressData};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// AeroScan event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// Every event belongs to exactly one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DemoEvent {
    /// New interactive session opened
    SessionCreated {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Workflow step changed (1 = Upload, 2 = Processing, 3 = Results)
    StepChanged {
        session_id: Uuid,
        old_step: u8,
        new_step: u8,
        /// Name of the user action that caused the transition
        action: String,
        timestamp: DateTime<Utc>,
    },

    /// Simulated processing phase started
    ProcessingPhaseStarted {
        session_id: Uuid,
        progress: PhaseProgressData,
        timestamp: DateTime<Utc>,
    },

    /// Processing script finished; results may be confirmed
    ProcessingCompleted {
        session_id: Uuid,
        metrics: Vec<KeyMetric>,
        timestamp: DateTime<Utc>,
    },

    /// Processing script stopped before its last phase
    ProcessingCancelled {
        session_id: Uuid,
        phases_completed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Export action acknowledged (no file is produced)
    ExportAcknowledged {
        session_id: Uuid,
        format: String,
        timestamp: DateTime<Utc>,
    },

    /// Report generation acknowledged
    ReportGenerated {
        session_id: Uuid,
        format: String,
        timestamp: DateTime<Utc>,
    },

    /// Session discarded
    SessionEnded {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl DemoEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            DemoEvent::SessionCreated { .. } => "SessionCreated",
            DemoEvent::StepChanged { .. } => "StepChanged",
            DemoEvent::ProcessingPhaseStarted { .. } => "ProcessingPhaseStarted",
            DemoEvent::ProcessingCompleted { .. } => "ProcessingCompleted",
            DemoEvent::ProcessingCancelled { .. } => "ProcessingCancelled",
            DemoEvent::ExportAcknowledged { .. } => "ExportAcknowledged",
            DemoEvent::ReportGenerated { .. } => "ReportGenerated",
            DemoEvent::SessionEnded { .. } => "SessionEnded",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            DemoEvent::SessionCreated { session_id, .. }
            | DemoEvent::StepChanged { session_id, .. }
            | DemoEvent::ProcessingPhaseStarted { session_id, .. }
            | DemoEvent::ProcessingCompleted { session_id, .. }
            | DemoEvent::ProcessingCancelled { session_id, .. }
            | DemoEvent::ExportAcknowledged { session_id, .. }
            | DemoEvent::ReportGenerated { session_id, .. }
            | DemoEvent::SessionEnded { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast bus for [`DemoEvent`]s
///
/// Cloning the bus yields another handle on the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DemoEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use aeroscan_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DemoEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DemoEvent,
    ) -> Result<usize, broadcast::error::SendError<DemoEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DemoEvent) {
        if let Err(broadcast::error::SendError(event)) = self.emit(event) {
            trace!(event_type = event.event_type(), "No subscribers for event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_session_id() {
        let session_id = Uuid::new_v4();
        let event = DemoEvent::StepChanged {
            session_id,
            old_step: 1,
            new_step: 2,
            action: "start_processing".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "StepChanged");
        assert_eq!(event.session_id(), session_id);
    }

    #[test]
    fn test_serialized_event_is_tagged() {
        let event = DemoEvent::ReportGenerated {
            session_id: Uuid::nil(),
            format: "PDF".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ReportGenerated");
        assert_eq!(json["format"], "PDF");
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        let result = bus.emit(DemoEvent::SessionEnded {
            session_id: Uuid::nil(),
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
        // emit_lossy must not panic either
        bus.emit_lossy(DemoEvent::SessionEnded {
            session_id: Uuid::nil(),
            timestamp: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let session_id = Uuid::new_v4();
        bus.emit(DemoEvent::SessionCreated {
            session_id,
            timestamp: Utc::now(),
        })
        .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.session_id(), session_id);
        assert_eq!(received.event_type(), "SessionCreated");
    }
}
