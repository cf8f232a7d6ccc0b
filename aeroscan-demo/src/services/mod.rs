//! Domain services: synthetic data, processing simulation, analytics

pub mod analytics;
pub mod generator;
pub mod processing;
pub mod report;
pub mod surface;

pub use analytics::{
    category_distribution, depth_histogram, CategoryCount, DefectFilter, DepthHistogram,
    HistogramBin, SummaryMetrics,
};
pub use generator::{generate, SAMPLE_DEFECT_COUNT, SAMPLE_SEED};
pub use processing::{ProcessingPhase, ProcessingRunner, ProcessingScript};
pub use report::render_report_text;
pub use surface::{synthesize_surface, DefectMarker, HeightField};
