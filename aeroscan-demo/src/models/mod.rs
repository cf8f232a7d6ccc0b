//! Data models for the AeroScan demo

pub mod defect;
pub mod process_state;
pub mod project;
pub mod report;

pub use defect::{DefectRecord, DefectType, DepthWidthRange, Recommendation, Severity};
pub use process_state::{ProcessState, ProcessingProgress, Step, StepTransition};
pub use project::{PavementType, ProjectMetadata, UploadManifest, ALLOWED_EXTENSIONS};
pub use report::{ExportFormat, ReportFormat};
