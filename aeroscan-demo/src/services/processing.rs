//! Simulated processing script
//!
//! # Phase Progression
//! READING → CALIBRATING → MODELLING → SLAM → AI ANALYSIS → GEOREFERENCING → REPORTING
//!
//! No real photogrammetry happens. Each phase shows its label, then pauses
//! for its configured duration. The script runs as a background task per
//! session and stops at the next phase boundary (or mid-pause) when its
//! cancellation token fires.

use std::time::Duration;

use aeroscan_common::events::{DemoEvent, EventBus, KeyMetric, PhaseProgressData};
use aeroscan_common::Result;
use aeroscan_common::time;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::DefectRecord;
use crate::services::analytics::SummaryMetrics;
use crate::session_store::SessionStore;

/// Phase labels in display order
pub const PHASE_LABELS: [&str; 7] = [
    "Reading drone data...",
    "Calibrating cameras...",
    "Building 3D model...",
    "SLAM reconstruction...",
    "AI defect analysis...",
    "Georeferencing results...",
    "Generating report...",
];

pub const COMPLETION_MESSAGE: &str = "Processing completed successfully!";

/// Canned figures shown next to the derived defect counts
pub const PROCESSING_TIME_LABEL: &str = "1 h 18 min";
pub const ACCURACY_LABEL: &str = "87.4%";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingPhase {
    pub label: String,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

/// Ordered list of phases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingScript {
    pub phases: Vec<ProcessingPhase>,
}

impl ProcessingScript {
    /// The seven standard phases, each pausing for `delay`
    pub fn standard(delay: Duration) -> Self {
        Self {
            phases: PHASE_LABELS
                .iter()
                .map(|label| ProcessingPhase {
                    label: (*label).to_string(),
                    duration: delay,
                })
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn total_duration(&self) -> Duration {
        self.phases.iter().map(|p| p.duration).sum()
    }
}

/// Key metrics shown once processing completes
pub fn key_metrics(records: &[DefectRecord]) -> Vec<KeyMetric> {
    let summary = SummaryMetrics::from_records(records);
    vec![
        KeyMetric {
            title: "Processing time".to_string(),
            value: PROCESSING_TIME_LABEL.to_string(),
        },
        KeyMetric {
            title: "Accuracy".to_string(),
            value: ACCURACY_LABEL.to_string(),
        },
        KeyMetric {
            title: "Defects".to_string(),
            value: summary.total.to_string(),
        },
        KeyMetric {
            title: "Critical".to_string(),
            value: summary.critical.to_string(),
        },
    ]
}

/// How a script run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Completed,
    Cancelled { phases_completed: usize },
}

/// Drives a [`ProcessingScript`] against one session's state
#[derive(Clone)]
pub struct ProcessingRunner {
    store: SessionStore,
    event_bus: EventBus,
    script: ProcessingScript,
}

impl ProcessingRunner {
    pub fn new(store: SessionStore, event_bus: EventBus, script: ProcessingScript) -> Self {
        Self {
            store,
            event_bus,
            script,
        }
    }

    /// Spawn the script for `session_id` as a background task
    ///
    /// The task's cancellation token is registered with the session store
    /// so that ending the session stops it.
    pub async fn spawn(self, session_id: Uuid) -> JoinHandle<Result<ProcessingOutcome>> {
        let token = CancellationToken::new();
        let task_id = self.store.register_task(session_id, token.clone()).await;

        tokio::spawn(async move {
            info!(
                session_id = %session_id,
                expected_ms = self.script.total_duration().as_millis() as u64,
                "Processing task started"
            );
            let result = self.run(session_id, &token).await;
            self.store.clear_task(session_id, task_id).await;

            match &result {
                Ok(outcome) => {
                    info!(session_id = %session_id, ?outcome, "Processing task finished")
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Processing task aborted")
                }
            }
            result
        })
    }

    /// Run every phase in order, then mark the session's processing finished
    pub async fn run(
        &self,
        session_id: Uuid,
        cancel_token: &CancellationToken,
    ) -> Result<ProcessingOutcome> {
        let total = self.script.len();

        for (index, phase) in self.script.phases.iter().enumerate() {
            if cancel_token.is_cancelled() {
                return Ok(self.cancelled(session_id, index));
            }

            let progress = PhaseProgressData::new(index, total, phase.label.clone());
            self.store
                .update(session_id, |state| state.record_phase(&progress))
                .await?;

            debug!(session_id = %session_id, phase = %phase.label, "Processing phase started");
            self.event_bus.emit_lossy(DemoEvent::ProcessingPhaseStarted {
                session_id,
                progress,
                timestamp: time::now(),
            });

            tokio::select! {
                _ = cancel_token.cancelled() => {
                    return Ok(self.cancelled(session_id, index));
                }
                _ = tokio::time::sleep(phase.duration) => {}
            }
        }

        let records = self
            .store
            .update(session_id, |state| {
                state.finish_processing()?;
                Ok(state.project_data_shared())
            })
            .await?;

        self.event_bus.emit_lossy(DemoEvent::ProcessingCompleted {
            session_id,
            metrics: key_metrics(records.as_deref().unwrap_or_default()),
            timestamp: time::now(),
        });
        Ok(ProcessingOutcome::Completed)
    }

    fn cancelled(&self, session_id: Uuid, phases_completed: usize) -> ProcessingOutcome {
        info!(session_id = %session_id, phases_completed, "Processing cancelled");
        self.event_bus.emit_lossy(DemoEvent::ProcessingCancelled {
            session_id,
            phases_completed,
            timestamp: time::now(),
        });
        ProcessingOutcome::Cancelled { phases_completed }
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Step;
    use aeroscan_common::Error;

    async fn processing_session(store: &SessionStore) -> Uuid {
        let id = store.create().await;
        store
            .update(id, |state| state.start_processing(42, 27))
            .await
            .unwrap();
        id
    }

    #[test]
    fn test_standard_script() {
        let script = ProcessingScript::standard(Duration::from_millis(500));
        assert_eq!(script.len(), 7);
        assert_eq!(script.phases[0].label, "Reading drone data...");
        assert_eq!(script.phases[6].label, "Generating report...");
        assert_eq!(script.total_duration(), Duration::from_millis(3500));
    }

    #[test]
    fn test_key_metrics_derive_counts() {
        let records = crate::services::generator::generate(42, 27).unwrap();
        let critical = records.iter().filter(|r| r.is_critical()).count();
        let metrics = key_metrics(&records);
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0].value, PROCESSING_TIME_LABEL);
        assert_eq!(metrics[2].value, "27");
        assert_eq!(metrics[3].value, critical.to_string());
    }

    #[tokio::test]
    async fn test_run_completes_and_emits_events() {
        let store = SessionStore::new();
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();
        let id = processing_session(&store).await;

        let runner = ProcessingRunner::new(
            store.clone(),
            bus.clone(),
            ProcessingScript::standard(Duration::ZERO),
        );
        let outcome = runner.run(id, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ProcessingOutcome::Completed);

        let state = store.get(id).await.unwrap();
        assert!(state.processing().finished);
        assert_eq!(state.processing().total_phases, 7);
        assert_eq!(state.step(), Step::Processing);

        let mut phase_events = 0;
        let mut completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                DemoEvent::ProcessingPhaseStarted { .. } => phase_events += 1,
                DemoEvent::ProcessingCompleted { metrics, .. } => {
                    completed = true;
                    assert_eq!(metrics[2].value, "27");
                }
                _ => {}
            }
        }
        assert_eq!(phase_events, 7);
        assert!(completed);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_phase() {
        let store = SessionStore::new();
        let id = processing_session(&store).await;
        let token = CancellationToken::new();
        token.cancel();

        let runner = ProcessingRunner::new(
            store.clone(),
            EventBus::new(8),
            ProcessingScript::standard(Duration::ZERO),
        );
        let outcome = runner.run(id, &token).await.unwrap();

        assert_eq!(outcome, ProcessingOutcome::Cancelled { phases_completed: 0 });
        assert!(!store.get(id).await.unwrap().processing().finished);
    }

    #[tokio::test]
    async fn test_cancel_during_pause() {
        let store = SessionStore::new();
        let id = processing_session(&store).await;
        let runner = ProcessingRunner::new(
            store.clone(),
            EventBus::new(8),
            ProcessingScript::standard(Duration::from_secs(60)),
        );

        let handle = runner.spawn(id).await;
        assert!(store.has_running_task(id).await);
        // Let the first phase start before cancelling
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.cancel_task(id).await);

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, ProcessingOutcome::Cancelled { phases_completed: 0 });
        let state = store.get(id).await.unwrap();
        assert_eq!(state.processing().phases_started, 1);
        assert!(!state.processing().finished);
    }

    #[tokio::test]
    async fn test_replaced_task_leaves_newer_token_registered() {
        let store = SessionStore::new();
        let id = processing_session(&store).await;
        let runner = ProcessingRunner::new(
            store.clone(),
            EventBus::new(8),
            ProcessingScript::standard(Duration::from_secs(60)),
        );

        let first = runner.clone().spawn(id).await;
        let second = runner.spawn(id).await;

        // Registering the second script cancels the first
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, ProcessingOutcome::Cancelled { .. }));
        assert!(store.has_running_task(id).await);

        assert!(store.cancel_task(id).await);
        let outcome = second.await.unwrap().unwrap();
        assert!(matches!(outcome, ProcessingOutcome::Cancelled { .. }));
        assert!(!store.has_running_task(id).await);
    }

    #[tokio::test]
    async fn test_run_on_upload_step_fails() {
        let store = SessionStore::new();
        let id = store.create().await;
        let runner = ProcessingRunner::new(
            store.clone(),
            EventBus::new(8),
            ProcessingScript::standard(Duration::ZERO),
        );
        let result = runner.run(id, &CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
    }
}
