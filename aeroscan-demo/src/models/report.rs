//! Export and report format selectors
//!
//! Neither produces a file: choosing a format only changes the
//! acknowledgment shown to the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Defect table export target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Dxf,
}

impl ExportFormat {
    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Dxf => "DXF",
        }
    }

    pub fn acknowledgment(self) -> String {
        format!("{} file ready", self.label())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = aeroscan_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "dxf" => Ok(ExportFormat::Dxf),
            _ => Err(aeroscan_common::Error::InvalidInput(format!(
                "Unknown export format: {}",
                s
            ))),
        }
    }
}

/// Technical report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Docx,
    Html,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Pdf, ReportFormat::Docx, ReportFormat::Html];

    pub fn label(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "PDF",
            ReportFormat::Docx => "DOCX",
            ReportFormat::Html => "HTML",
        }
    }

    pub fn acknowledgment(self) -> String {
        format!("Report in {} format is ready!", self.label())
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_acknowledgments() {
        assert_eq!(ExportFormat::Csv.acknowledgment(), "CSV file ready");
        assert_eq!("DXF".parse::<ExportFormat>().unwrap(), ExportFormat::Dxf);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_report_format_wire_names() {
        let parsed: ReportFormat = serde_json::from_str("\"DOCX\"").unwrap();
        assert_eq!(parsed, ReportFormat::Docx);
        assert_eq!(ReportFormat::Html.acknowledgment(), "Report in HTML format is ready!");
    }
}
