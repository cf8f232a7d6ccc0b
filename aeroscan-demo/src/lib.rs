//! aeroscan-demo library interface
//!
//! Exposes the session workflow, services and router for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod services;
pub mod session_store;
pub mod view;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::Duration;

use aeroscan_common::config::DemoConfig;
use aeroscan_common::events::{DemoEvent, EventBus};
use aeroscan_common::time;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::services::ProcessingScript;
use crate::session_store::SessionStore;

/// Capacity of the broadcast channel behind the event bus
pub const EVENT_BUS_CAPACITY: usize = 256;

/// How often idle sessions are looked for
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Per-session workflow state
    pub sessions: SessionStore,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub config: Arc<DemoConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            sessions: SessionStore::new(),
            event_bus: EventBus::new(EVENT_BUS_CAPACITY),
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }

    /// Processing script with the configured phase pause
    pub fn processing_script(&self) -> ProcessingScript {
        ProcessingScript::standard(self.config.phase_delay())
    }

    /// Periodically discard sessions idle longer than the configured TTL
    ///
    /// Eviction cancels any processing script the session still owns and
    /// emits `SessionEnded`, the same as an explicit delete.
    pub fn spawn_session_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        let ttl = self.config.session_ttl();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for session_id in state.sessions.evict_idle(ttl).await {
                    debug!(session_id = %session_id, "Idle session expired");
                    state.event_bus.emit_lossy(DemoEvent::SessionEnded {
                        session_id,
                        timestamp: time::now(),
                    });
                }
            }
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // API routes
        .merge(api::session_routes())
        .merge(api::results_routes())
        .route("/events", get(api::event_stream))
        .route("/api/sessions/:id/events", get(api::session_event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
