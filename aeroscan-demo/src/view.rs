//! View model rendering
//!
//! `render` is a pure function from session state to everything a page
//! needs to display. It never mutates state; the HTML pages and the JSON
//! API both serialize its output.

use serde::Serialize;
use uuid::Uuid;

use aeroscan_common::events::KeyMetric;

use crate::models::{
    DefectRecord, DefectType, PavementType, ProcessState, ProjectMetadata, ReportFormat,
    Severity, Step, ALLOWED_EXTENSIONS,
};
use crate::services::analytics::{
    self, category_distribution, depth_histogram, CategoryCount, DefectFilter, DepthHistogram,
    SummaryMetrics, DEFAULT_BIN_WIDTH_CM,
};
use crate::services::processing::{key_metrics, COMPLETION_MESSAGE, PHASE_LABELS};
use crate::services::report::render_report_text;
use crate::services::surface::{synthesize_surface, HeightField};
use crate::services::SAMPLE_SEED;

/// Feature list shown beside the upload form
pub const CAPABILITIES: [&str; 5] = [
    "ODM photogrammetry",
    "AI defect detection",
    "SLAM acceleration",
    "Georeferencing",
    "Report export",
];

#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub session_id: Uuid,
    pub step: Step,
    pub steps: Vec<StepBadge>,
    pub body: ViewBody,
}

/// Workflow header entry; `reached` once the session is at or past it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepBadge {
    pub number: u8,
    pub label: &'static str,
    pub reached: bool,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewBody {
    Upload(UploadView),
    Processing(ProcessingView),
    Results(Box<ResultsView>),
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadView {
    pub uploaded_files: usize,
    /// e.g. "Uploaded 3 files", shown only once files are selected
    pub upload_message: Option<String>,
    pub metadata: ProjectMetadata,
    pub allowed_extensions: Vec<&'static str>,
    pub pavement_types: Vec<PavementType>,
    pub capabilities: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
    Done,
    Active,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseStatus {
    pub label: &'static str,
    pub state: PhaseState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingView {
    pub phases: Vec<PhaseStatus>,
    pub percentage: f64,
    pub status_message: Option<String>,
    pub finished: bool,
    /// Populated once processing has finished
    pub metrics: Vec<KeyMetric>,
    /// The "go to results" action is offered
    pub can_confirm: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefectTableView {
    pub records: Vec<DefectRecord>,
    pub type_options: Vec<DefectType>,
    pub severity_options: Vec<Severity>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsView {
    pub distribution: Vec<CategoryCount>,
    pub histogram: DepthHistogram,
    pub summary: SummaryMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub preview: String,
    pub formats: Vec<ReportFormat>,
    pub generated: Option<ReportFormat>,
    pub acknowledgment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub defects: DefectTableView,
    pub analytics: AnalyticsView,
    pub surface: HeightField,
    pub report: ReportView,
}

/// Render the complete view for the session's current step
pub fn render(state: &ProcessState) -> View {
    let step = state.step();
    let steps = Step::ALL
        .iter()
        .map(|&s| StepBadge {
            number: s.number(),
            label: s.label(),
            reached: step >= s,
            current: step == s,
        })
        .collect();

    let body = match step {
        Step::Upload => ViewBody::Upload(render_upload(state)),
        Step::Processing => ViewBody::Processing(render_processing(state)),
        Step::Results => ViewBody::Results(Box::new(render_results(state))),
    };

    View {
        session_id: state.session_id,
        step,
        steps,
        body,
    }
}

fn render_upload(state: &ProcessState) -> UploadView {
    let count = state.upload().count();
    UploadView {
        uploaded_files: count,
        upload_message: (count > 0).then(|| format!("Uploaded {} files", count)),
        metadata: state.metadata().clone(),
        allowed_extensions: ALLOWED_EXTENSIONS.to_vec(),
        pavement_types: PavementType::ALL.to_vec(),
        capabilities: CAPABILITIES.to_vec(),
    }
}

fn render_processing(state: &ProcessState) -> ProcessingView {
    let progress = state.processing();
    let phases = PHASE_LABELS
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            let phase_state = if progress.finished || i + 1 < progress.phases_started {
                PhaseState::Done
            } else if i + 1 == progress.phases_started {
                PhaseState::Active
            } else {
                PhaseState::Pending
            };
            PhaseStatus {
                label,
                state: phase_state,
            }
        })
        .collect();

    let status_message = if progress.finished {
        Some(COMPLETION_MESSAGE.to_string())
    } else {
        progress.current_label.clone()
    };

    let metrics = match (progress.finished, state.project_data()) {
        (true, Some(records)) => key_metrics(records),
        _ => Vec::new(),
    };

    ProcessingView {
        phases,
        percentage: progress.percentage(),
        status_message,
        finished: progress.finished,
        metrics,
        can_confirm: progress.finished,
    }
}

fn render_results(state: &ProcessState) -> ResultsView {
    let records = state.project_data().unwrap_or_default();
    let summary = SummaryMetrics::from_records(records);

    ResultsView {
        defects: render_defect_table(records, &DefectFilter::default()),
        analytics: AnalyticsView {
            distribution: category_distribution(records),
            histogram: depth_histogram(records, DEFAULT_BIN_WIDTH_CM),
            summary: summary.clone(),
        },
        surface: synthesize_surface(state.data_seed().unwrap_or(SAMPLE_SEED), records),
        report: ReportView {
            preview: render_report_text(state.metadata(), &summary),
            formats: ReportFormat::ALL.to_vec(),
            generated: state.report_format(),
            acknowledgment: state.report_format().map(ReportFormat::acknowledgment),
        },
    }
}

/// Filtered defect table; filter options always list every value present
pub fn render_defect_table(records: &[DefectRecord], filter: &DefectFilter) -> DefectTableView {
    DefectTableView {
        records: filter.apply(records).into_iter().cloned().collect(),
        type_options: analytics::type_options(records),
        severity_options: analytics::severity_options(records),
        total: records.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadManifest;
    use aeroscan_common::events::PhaseProgressData;

    #[test]
    fn test_upload_view() {
        let mut state = ProcessState::new();
        let view = render(&state);
        assert_eq!(view.step, Step::Upload);
        assert!(view.steps[0].current && view.steps[0].reached);
        assert!(!view.steps[1].reached);
        match &view.body {
            ViewBody::Upload(upload) => {
                assert_eq!(upload.uploaded_files, 0);
                assert!(upload.upload_message.is_none());
            }
            other => panic!("expected upload body, got {:?}", other),
        }

        state
            .set_upload(UploadManifest::from_files(vec!["a.jpg".into(), "b.las".into()]).unwrap())
            .unwrap();
        match render(&state).body {
            ViewBody::Upload(upload) => {
                assert_eq!(upload.upload_message.as_deref(), Some("Uploaded 2 files"))
            }
            other => panic!("expected upload body, got {:?}", other),
        }
    }

    #[test]
    fn test_processing_view_tracks_phases() {
        let mut state = ProcessState::new();
        state.start_processing(42, 27).unwrap();
        state
            .record_phase(&PhaseProgressData::new(2, PHASE_LABELS.len(), PHASE_LABELS[2]))
            .unwrap();

        let ViewBody::Processing(view) = render(&state).body else {
            panic!("expected processing body");
        };
        assert_eq!(view.phases[1].state, PhaseState::Done);
        assert_eq!(view.phases[2].state, PhaseState::Active);
        assert_eq!(view.phases[3].state, PhaseState::Pending);
        assert_eq!(view.status_message.as_deref(), Some(PHASE_LABELS[2]));
        assert!(!view.can_confirm);
        assert!(view.metrics.is_empty());

        state.finish_processing().unwrap();
        let ViewBody::Processing(view) = render(&state).body else {
            panic!("expected processing body");
        };
        assert!(view.can_confirm);
        assert!(view.phases.iter().all(|p| p.state == PhaseState::Done));
        assert_eq!(view.status_message.as_deref(), Some(COMPLETION_MESSAGE));
        assert_eq!(view.metrics.len(), 4);
    }

    #[test]
    fn test_results_view_is_derived_from_project_data() {
        let mut state = ProcessState::new();
        state.start_processing(42, 27).unwrap();
        state.finish_processing().unwrap();
        state.confirm_results().unwrap();

        let view = render(&state);
        assert!(view.steps.iter().all(|b| b.reached));
        let ViewBody::Results(results) = view.body else {
            panic!("expected results body");
        };
        assert_eq!(results.defects.records.as_slice(), state.project_data().unwrap());
        assert_eq!(results.analytics.summary.total, 27);
        assert!(results.surface.markers.len() <= 3);
        assert!(results.report.preview.contains("**Defects found:** 27"));
        assert!(results.report.generated.is_none());
    }

    #[test]
    fn test_render_does_not_mutate_and_is_repeatable() {
        let mut state = ProcessState::new();
        state.start_processing(42, 27).unwrap();
        let before = state.processing().clone();
        let a = serde_json::to_value(render(&state)).unwrap();
        let b = serde_json::to_value(render(&state)).unwrap();
        assert_eq!(a, b);
        assert_eq!(state.processing(), &before);
        assert_eq!(a["body"]["kind"], "processing");
        assert_eq!(a["step"], 2);
    }

    #[test]
    fn test_defect_table_filter_keeps_all_options() {
        let records = crate::services::generate(42, 27).unwrap();
        let filter = DefectFilter {
            types: Some(vec![DefectType::Pit]),
            severities: None,
        };
        let table = render_defect_table(&records, &filter);
        assert!(table.records.iter().all(|r| r.defect_type == DefectType::Pit));
        assert_eq!(table.total, 27);
        assert_eq!(table.type_options, analytics::type_options(&records));
    }
}
