//! Project input: uploaded file manifest and survey metadata
//!
//! Neither feeds the defect generator. Files are only counted and the
//! metadata is only echoed into the report, but both are validated at the
//! boundary so malformed values never reach session state.

use aeroscan_common::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accepted drone imagery / point-cloud extensions
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "png", "tif", "las", "laz", "obj"];

pub const MIN_ROAD_LENGTH_KM: f64 = 0.1;
pub const MAX_ROAD_LENGTH_KM: f64 = 50.0;

/// Names of the files selected for upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadManifest {
    pub files: Vec<String>,
}

impl UploadManifest {
    /// Validate a file selection against [`ALLOWED_EXTENSIONS`]
    ///
    /// The whole selection is rejected if any single file is not allowed.
    pub fn from_files(files: Vec<String>) -> Result<Self> {
        let rejected: Vec<&str> = files
            .iter()
            .map(String::as_str)
            .filter(|name| !has_allowed_extension(name))
            .collect();

        if !rejected.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Unsupported file type(s): {} (allowed: {})",
                rejected.join(", "),
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        Ok(Self { files })
    }

    pub fn count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_allowed_extension(name: &str) -> bool {
    std::path::Path::new(name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Road surface material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PavementType {
    #[default]
    Dirt,
    Gravel,
    Asphalt,
}

impl PavementType {
    pub const ALL: [PavementType; 3] = [PavementType::Dirt, PavementType::Gravel, PavementType::Asphalt];

    pub fn label(self) -> &'static str {
        match self {
            PavementType::Dirt => "Dirt",
            PavementType::Gravel => "Crushed stone",
            PavementType::Asphalt => "Asphalt",
        }
    }
}

impl fmt::Display for PavementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Survey details entered next to the upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_name: String,
    /// Accepts `dd.mm.yyyy` or ISO `yyyy-mm-dd`; serialized as ISO
    #[serde(deserialize_with = "deserialize_survey_date")]
    pub survey_date: NaiveDate,
    pub road_length_km: f64,
    #[serde(default)]
    pub pavement_type: PavementType,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_name: "Vostochny Quarry".to_string(),
            survey_date: aeroscan_common::time::today(),
            road_length_km: 8.2,
            pavement_type: PavementType::default(),
        }
    }
}

impl ProjectMetadata {
    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Project name must not be empty".to_string(),
            ));
        }
        if !self.road_length_km.is_finite()
            || self.road_length_km < MIN_ROAD_LENGTH_KM
            || self.road_length_km > MAX_ROAD_LENGTH_KM
        {
            return Err(Error::InvalidInput(format!(
                "Road length must be between {} and {} km, got {}",
                MIN_ROAD_LENGTH_KM, MAX_ROAD_LENGTH_KM, self.road_length_km
            )));
        }
        Ok(())
    }

    pub fn display_date(&self) -> String {
        aeroscan_common::time::format_date(self.survey_date)
    }
}

fn deserialize_survey_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    aeroscan_common::time::parse_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid survey date: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_accepts_allowed_extensions_any_case() {
        let manifest = UploadManifest::from_files(vec![
            "frame_0001.JPG".to_string(),
            "ortho.tif".to_string(),
            "cloud.laz".to_string(),
        ])
        .unwrap();
        assert_eq!(manifest.count(), 3);
    }

    #[test]
    fn test_manifest_rejects_whole_selection_on_bad_file() {
        let err = UploadManifest::from_files(vec![
            "frame.png".to_string(),
            "notes.txt".to_string(),
            "no_extension".to_string(),
        ])
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("notes.txt"));
        assert!(message.contains("no_extension"));
        assert!(!message.contains("frame.png,"));
    }

    #[test]
    fn test_default_metadata_is_valid() {
        let metadata = ProjectMetadata::default();
        assert!(metadata.validate().is_ok());
        assert_eq!(metadata.road_length_km, 8.2);
    }

    #[test]
    fn test_negative_road_length_rejected() {
        let metadata = ProjectMetadata {
            road_length_km: -1.0,
            ..ProjectMetadata::default()
        };
        assert!(matches!(metadata.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_nan_and_oversized_road_length_rejected() {
        for length in [f64::NAN, 50.5, 0.05] {
            let metadata = ProjectMetadata {
                road_length_km: length,
                ..ProjectMetadata::default()
            };
            assert!(metadata.validate().is_err(), "{} should be rejected", length);
        }
    }

    #[test]
    fn test_blank_project_name_rejected() {
        let metadata = ProjectMetadata {
            project_name: "   ".to_string(),
            ..ProjectMetadata::default()
        };
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_metadata_deserializes_iso_date() {
        let metadata: ProjectMetadata = serde_json::from_str(
            r#"{"project_name":"North pit","survey_date":"2025-06-01","road_length_km":3.5}"#,
        )
        .unwrap();
        assert_eq!(metadata.pavement_type, PavementType::Dirt);
        assert_eq!(metadata.display_date(), "01.06.2025");
    }

    #[test]
    fn test_metadata_accepts_dotted_date() {
        let metadata: ProjectMetadata = serde_json::from_str(
            r#"{"project_name":"North pit","survey_date":"14.09.2025","road_length_km":3.5}"#,
        )
        .unwrap();
        assert_eq!(metadata.survey_date, NaiveDate::from_ymd_opt(2025, 9, 14).unwrap());
        assert!(serde_json::from_str::<ProjectMetadata>(
            r#"{"project_name":"x","survey_date":"soon","road_length_km":3.5}"#
        )
        .is_err());
    }
}
