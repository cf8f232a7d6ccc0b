//! Workflow step state machine
//!
//! A session progresses through three steps:
//! UPLOAD (1) → PROCESSING (2) → RESULTS (3) → back to UPLOAD on "new project"
//!
//! Every transition is a named method on [`ProcessState`]. A method called
//! from a step that does not offer the action returns
//! [`Error::InvalidTransition`] and leaves the state untouched.

use aeroscan_common::events::PhaseProgressData;
use aeroscan_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{DefectRecord, ProjectMetadata, ReportFormat, UploadManifest};
use crate::services::generator;

pub const ACTION_START_PROCESSING: &str = "start_processing";
pub const ACTION_USE_SAMPLE_DATA: &str = "use_sample_data";
pub const ACTION_CONFIRM_RESULTS: &str = "confirm_results";
pub const ACTION_NEW_PROJECT: &str = "new_project";

/// Workflow step, serialized as its number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Step {
    Upload = 1,
    Processing = 2,
    Results = 3,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Upload, Step::Processing, Step::Results];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Upload => "Data upload",
            Step::Processing => "Processing",
            Step::Results => "Results",
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.number()
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Step::Upload),
            2 => Ok(Step::Processing),
            3 => Ok(Step::Results),
            other => Err(format!("step must be 1, 2 or 3, got {}", other)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// Record of one step change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTransition {
    pub session_id: Uuid,
    pub old_step: Step,
    pub new_step: Step,
    pub action: String,
    pub transitioned_at: DateTime<Utc>,
}

/// Progress of the simulated processing script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingProgress {
    /// Phases started so far
    pub phases_started: usize,
    /// Phases in the script (0 until the first phase starts)
    pub total_phases: usize,
    /// Label of the phase currently shown
    pub current_label: Option<String>,
    /// Script ran to completion; results may be confirmed
    pub finished: bool,
}

impl ProcessingProgress {
    /// Percentage complete (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.finished {
            100.0
        } else if self.total_phases > 0 {
            (self.phases_started as f64 / self.total_phases as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Session-scoped workflow state
///
/// `project_data` is created in full when leaving Upload, is read-only
/// afterwards, and is dropped when the user starts a new project.
#[derive(Debug, Clone)]
pub struct ProcessState {
    pub session_id: Uuid,
    step: Step,
    project_data: Option<Arc<[DefectRecord]>>,
    /// Seed the current project data was generated with
    data_seed: Option<u64>,
    used_sample_data: bool,
    upload: UploadManifest,
    metadata: ProjectMetadata,
    processing: ProcessingProgress,
    report: Option<ReportFormat>,
    pub created_at: DateTime<Utc>,
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessState {
    /// Fresh session at step 1 with no project data
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            step: Step::Upload,
            project_data: None,
            data_seed: None,
            used_sample_data: false,
            upload: UploadManifest::default(),
            metadata: ProjectMetadata::default(),
            processing: ProcessingProgress::default(),
            report: None,
            created_at: Utc::now(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn project_data(&self) -> Option<&[DefectRecord]> {
        self.project_data.as_deref()
    }

    /// Shared handle on the project data; cloning it does not copy records
    pub fn project_data_shared(&self) -> Option<Arc<[DefectRecord]>> {
        self.project_data.clone()
    }

    pub fn data_seed(&self) -> Option<u64> {
        self.data_seed
    }

    pub fn used_sample_data(&self) -> bool {
        self.used_sample_data
    }

    pub fn upload(&self) -> &UploadManifest {
        &self.upload
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    pub fn processing(&self) -> &ProcessingProgress {
        &self.processing
    }

    /// Format of the last generated report, if any
    pub fn report_format(&self) -> Option<ReportFormat> {
        self.report
    }

    pub fn report_generated(&self) -> bool {
        self.report.is_some()
    }

    /// Replace the file selection (Upload step only)
    pub fn set_upload(&mut self, manifest: UploadManifest) -> Result<usize> {
        self.require_step(Step::Upload, "upload_files")?;
        self.upload = manifest;
        Ok(self.upload.count())
    }

    /// Replace the project metadata after validating it (Upload step only)
    pub fn set_metadata(&mut self, metadata: ProjectMetadata) -> Result<()> {
        self.require_step(Step::Upload, "update_metadata")?;
        metadata.validate()?;
        self.metadata = metadata;
        Ok(())
    }

    /// Upload → Processing via "start processing"
    pub fn start_processing(&mut self, seed: u64, count: usize) -> Result<StepTransition> {
        self.enter_processing(seed, count, ACTION_START_PROCESSING, false)
    }

    /// Upload → Processing via the "use sample data" quick start
    pub fn use_sample_data(&mut self, seed: u64, count: usize) -> Result<StepTransition> {
        self.enter_processing(seed, count, ACTION_USE_SAMPLE_DATA, true)
    }

    fn enter_processing(
        &mut self,
        seed: u64,
        count: usize,
        action: &str,
        sample: bool,
    ) -> Result<StepTransition> {
        self.require_step(Step::Upload, action)?;

        // Generate before touching state so a failure leaves step 1 intact
        let records = generator::generate(seed, count)?;

        self.project_data = Some(Arc::from(records));
        self.data_seed = Some(seed);
        self.used_sample_data = sample;
        self.processing = ProcessingProgress::default();
        self.report = None;
        Ok(self.transition_to(Step::Processing, action))
    }

    /// Record that a processing phase started (Processing step only)
    pub fn record_phase(&mut self, progress: &PhaseProgressData) -> Result<()> {
        self.require_step(Step::Processing, "record_phase")?;
        self.processing.phases_started = progress.index + 1;
        self.processing.total_phases = progress.total;
        self.processing.current_label = Some(progress.label.clone());
        Ok(())
    }

    /// Mark the processing script as complete (Processing step only)
    pub fn finish_processing(&mut self) -> Result<()> {
        self.require_step(Step::Processing, "finish_processing")?;
        self.processing.phases_started = self.processing.total_phases;
        self.processing.current_label = None;
        self.processing.finished = true;
        Ok(())
    }

    /// Processing → Results, once the processing script has finished
    pub fn confirm_results(&mut self) -> Result<StepTransition> {
        self.require_step(Step::Processing, ACTION_CONFIRM_RESULTS)?;
        if !self.processing.finished {
            return Err(Error::InvalidTransition {
                from: self.step.number(),
                action: format!("{} (processing still running)", ACTION_CONFIRM_RESULTS),
            });
        }
        Ok(self.transition_to(Step::Results, ACTION_CONFIRM_RESULTS))
    }

    /// Results → Upload; discards project data, uploads and the report flag
    pub fn new_project(&mut self) -> Result<StepTransition> {
        self.require_step(Step::Results, ACTION_NEW_PROJECT)?;
        self.project_data = None;
        self.data_seed = None;
        self.used_sample_data = false;
        self.upload = UploadManifest::default();
        self.processing = ProcessingProgress::default();
        self.report = None;
        Ok(self.transition_to(Step::Upload, ACTION_NEW_PROJECT))
    }

    /// Set the report-generated flag (Results step only)
    pub fn generate_report(&mut self, format: ReportFormat) -> Result<String> {
        self.require_step(Step::Results, "generate_report")?;
        self.report = Some(format);
        Ok(format.acknowledgment())
    }

    /// Project data, available from Processing onwards
    pub fn require_project_data(&self, action: &str) -> Result<&[DefectRecord]> {
        self.project_data().ok_or_else(|| Error::InvalidTransition {
            from: self.step.number(),
            action: action.to_string(),
        })
    }

    /// Fail with `InvalidTransition` unless the session is at `step`
    pub fn require_step(&self, step: Step, action: &str) -> Result<()> {
        if self.step == step {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.step.number(),
                action: action.to_string(),
            })
        }
    }

    fn transition_to(&mut self, new_step: Step, action: &str) -> StepTransition {
        let transition = StepTransition {
            session_id: self.session_id,
            old_step: self.step,
            new_step,
            action: action.to_string(),
            transitioned_at: Utc::now(),
        };
        self.step = new_step;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 42;
    const COUNT: usize = 27;

    fn finish(state: &mut ProcessState) {
        for index in 0..3 {
            state
                .record_phase(&PhaseProgressData::new(index, 3, format!("phase {}", index)))
                .unwrap();
        }
        state.finish_processing().unwrap();
    }

    #[test]
    fn test_new_state_is_upload_without_data() {
        let state = ProcessState::new();
        assert_eq!(state.step(), Step::Upload);
        assert!(state.project_data().is_none());
        assert!(!state.report_generated());
    }

    #[test]
    fn test_full_cycle() {
        let mut state = ProcessState::new();

        let t = state.start_processing(SEED, COUNT).unwrap();
        assert_eq!((t.old_step, t.new_step), (Step::Upload, Step::Processing));
        assert_eq!(state.step(), Step::Processing);
        assert_eq!(state.project_data().unwrap().len(), COUNT);
        let generated = state.project_data().unwrap().to_vec();

        finish(&mut state);
        let t = state.confirm_results().unwrap();
        assert_eq!(t.new_step, Step::Results);
        assert_eq!(state.project_data().unwrap(), generated.as_slice());

        state.generate_report(ReportFormat::Docx).unwrap();
        assert!(state.report_generated());

        let t = state.new_project().unwrap();
        assert_eq!((t.old_step, t.new_step), (Step::Results, Step::Upload));
        assert!(state.project_data().is_none());
        assert!(!state.report_generated());
        assert_eq!(state.processing(), &ProcessingProgress::default());
    }

    #[test]
    fn test_sample_data_path_flags_state() {
        let mut state = ProcessState::new();
        let t = state.use_sample_data(SEED, COUNT).unwrap();
        assert_eq!(t.action, ACTION_USE_SAMPLE_DATA);
        assert!(state.used_sample_data());
        assert_eq!(state.data_seed(), Some(SEED));
    }

    #[test]
    fn test_confirm_before_processing_finishes_is_rejected() {
        let mut state = ProcessState::new();
        state.start_processing(SEED, COUNT).unwrap();
        let err = state.confirm_results().unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { from: 2, .. }));
        assert_eq!(state.step(), Step::Processing);
    }

    #[test]
    fn test_out_of_order_actions_are_rejected() {
        let mut state = ProcessState::new();
        assert!(state.confirm_results().is_err());
        assert!(state.new_project().is_err());
        assert!(state.generate_report(ReportFormat::Pdf).is_err());

        state.start_processing(SEED, COUNT).unwrap();
        assert!(state.start_processing(SEED, COUNT).is_err());
        assert!(state.set_upload(UploadManifest::default()).is_err());
        assert_eq!(state.step(), Step::Processing);
    }

    #[test]
    fn test_generation_failure_keeps_upload_step() {
        let mut state = ProcessState::new();
        let err = state.start_processing(SEED, 0).unwrap_err();
        assert!(matches!(err, Error::GenerationFailure(_)));
        assert_eq!(state.step(), Step::Upload);
        assert!(state.project_data().is_none());
    }

    #[test]
    fn test_invalid_metadata_not_stored() {
        let mut state = ProcessState::new();
        let bad = ProjectMetadata {
            road_length_km: -3.0,
            ..ProjectMetadata::default()
        };
        assert!(state.set_metadata(bad).is_err());
        assert_eq!(state.metadata().road_length_km, 8.2);
    }

    #[test]
    fn test_progress_percentage() {
        let mut state = ProcessState::new();
        state.start_processing(SEED, COUNT).unwrap();
        assert_eq!(state.processing().percentage(), 0.0);

        state
            .record_phase(&PhaseProgressData::new(1, 4, "second"))
            .unwrap();
        assert_eq!(state.processing().percentage(), 50.0);
        assert_eq!(state.processing().current_label.as_deref(), Some("second"));

        state.finish_processing().unwrap();
        assert_eq!(state.processing().percentage(), 100.0);
    }

    #[test]
    fn test_step_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Step::Results).unwrap(), "3");
        assert_eq!(serde_json::from_str::<Step>("2").unwrap(), Step::Processing);
        assert!(serde_json::from_str::<Step>("4").is_err());
    }
}
