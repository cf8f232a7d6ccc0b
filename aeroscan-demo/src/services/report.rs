//! Technical report template
//!
//! The report preview is plain markdown-style text filled with project
//! metadata and numbers derived from the defect table.

use std::fmt::Write;

use crate::models::ProjectMetadata;
use crate::services::analytics::SummaryMetrics;

/// Render the technical report preview
pub fn render_report_text(metadata: &ProjectMetadata, summary: &SummaryMetrics) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "# TECHNICAL REPORT");
    let _ = writeln!(out, "**Site:** \"{}\"  ", metadata.project_name.trim());
    let _ = writeln!(out, "**Survey date:** {}  ", metadata.display_date());
    let _ = writeln!(out, "**Pavement:** {}", metadata.pavement_type);
    let _ = writeln!(out);
    let _ = writeln!(out, "## SUMMARY");
    let _ = writeln!(out, "- **Road length:** {:.1} km", metadata.road_length_km);
    let _ = writeln!(out, "- **Defects found:** {}", summary.total);
    let _ = writeln!(out, "- **Critical:** {}", summary.critical);
    let _ = writeln!(out);
    let _ = writeln!(out, "## RECOMMENDATIONS");
    let _ = writeln!(out, "- **Priority 1:** Repair critical defects");
    let _ = write!(out, "- **Priority 2:** Scheduled repair of remaining defects");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DefectRecord, DefectType, PavementType};
    use chrono::NaiveDate;

    #[test]
    fn test_report_contains_metadata_and_counts() {
        let metadata = ProjectMetadata {
            project_name: "East Quarry".to_string(),
            survey_date: NaiveDate::from_ymd_opt(2025, 9, 14).unwrap(),
            road_length_km: 12.0,
            pavement_type: PavementType::Gravel,
        };
        let records = vec![
            DefectRecord::new(1, DefectType::Pit, 25.0, 60.0, 0.0, 0.0),
            DefectRecord::new(2, DefectType::Crack, 3.0, 10.0, 0.0, 0.0),
        ];
        let text = render_report_text(&metadata, &SummaryMetrics::from_records(&records));

        assert!(text.starts_with("# TECHNICAL REPORT"));
        assert!(text.contains("**Site:** \"East Quarry\""));
        assert!(text.contains("**Survey date:** 14.09.2025"));
        assert!(text.contains("**Road length:** 12.0 km"));
        assert!(text.contains("**Defects found:** 2"));
        assert!(text.contains("**Critical:** 1"));
        assert!(text.contains("Crushed stone"));
    }
}
