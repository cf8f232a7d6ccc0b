//! Defect record types
//!
//! A defect is a synthetic road-surface anomaly. Its severity and repair
//! recommendation are derived from its depth, never sampled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of road-surface anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DefectType {
    Pit,
    Crack,
    Subsidence,
    Pothole,
    RutTrack,
}

/// Closed sampling intervals for one defect category, in centimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthWidthRange {
    pub depth: (f64, f64),
    pub width: (f64, f64),
}

impl DepthWidthRange {
    pub fn contains(&self, depth_cm: f64, width_cm: f64) -> bool {
        (self.depth.0..=self.depth.1).contains(&depth_cm)
            && (self.width.0..=self.width.1).contains(&width_cm)
    }
}

impl DefectType {
    /// All categories in sampling order
    pub const ALL: [DefectType; 5] = [
        DefectType::Pit,
        DefectType::Crack,
        DefectType::Subsidence,
        DefectType::Pothole,
        DefectType::RutTrack,
    ];

    /// Sampling probability; the five weights sum to 1.0
    pub fn probability(self) -> f64 {
        match self {
            DefectType::Pit => 0.40,
            DefectType::Crack => 0.25,
            DefectType::Subsidence => 0.15,
            DefectType::Pothole => 0.10,
            DefectType::RutTrack => 0.10,
        }
    }

    pub fn range(self) -> DepthWidthRange {
        match self {
            DefectType::Pit => DepthWidthRange {
                depth: (8.0, 45.0),
                width: (40.0, 200.0),
            },
            DefectType::Crack => DepthWidthRange {
                depth: (2.0, 15.0),
                width: (5.0, 50.0),
            },
            DefectType::Subsidence | DefectType::Pothole | DefectType::RutTrack => {
                DepthWidthRange {
                    depth: (5.0, 25.0),
                    width: (30.0, 120.0),
                }
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DefectType::Pit => "Pit",
            DefectType::Crack => "Crack",
            DefectType::Subsidence => "Subsidence",
            DefectType::Pothole => "Pothole",
            DefectType::RutTrack => "Rut track",
        }
    }
}

impl fmt::Display for DefectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DefectType {
    type Err = aeroscan_common::Error;

    /// Accepts the wire name or the display label, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "pit" => Ok(DefectType::Pit),
            "crack" => Ok(DefectType::Crack),
            "subsidence" => Ok(DefectType::Subsidence),
            "pothole" => Ok(DefectType::Pothole),
            "ruttrack" => Ok(DefectType::RutTrack),
            _ => Err(aeroscan_common::Error::InvalidInput(format!(
                "Unknown defect type: {}",
                s
            ))),
        }
    }
}

/// Severity tier derived from depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// `> 20 cm` is High, `> 10 cm` is Medium, anything else Low
    pub fn from_depth(depth_cm: f64) -> Self {
        if depth_cm > 20.0 {
            Severity::High
        } else if depth_cm > 10.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }

    /// Chart colour used by the depth histogram
    pub fn color(self) -> &'static str {
        match self {
            Severity::Low => "#00c896",
            Severity::Medium => "#ffa502",
            Severity::High => "#ff4757",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = aeroscan_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(aeroscan_common::Error::InvalidInput(format!(
                "Unknown severity: {}",
                s
            ))),
        }
    }
}

/// Repair recommendation derived from severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    UrgentRepair,
    ScheduledRepair,
}

impl Recommendation {
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::High => Recommendation::UrgentRepair,
            Severity::Medium | Severity::Low => Recommendation::ScheduledRepair,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Recommendation::UrgentRepair => "Urgent repair",
            Recommendation::ScheduledRepair => "Scheduled repair",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One detected (synthetic) anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectRecord {
    /// Sequential id, 1..=N
    pub id: u32,
    pub defect_type: DefectType,
    /// Depth in centimetres, one decimal place
    pub depth_cm: f64,
    /// Width in centimetres, one decimal place
    pub width_cm: f64,
    pub severity: Severity,
    pub recommendation: Recommendation,
    /// Planar survey easting, two decimal places
    pub coord_x: f64,
    /// Planar survey northing, two decimal places
    pub coord_y: f64,
}

impl DefectRecord {
    /// Build a record, deriving severity and recommendation from `depth_cm`
    pub fn new(
        id: u32,
        defect_type: DefectType,
        depth_cm: f64,
        width_cm: f64,
        coord_x: f64,
        coord_y: f64,
    ) -> Self {
        let severity = Severity::from_depth(depth_cm);
        Self {
            id,
            defect_type,
            depth_cm,
            width_cm,
            severity,
            recommendation: Recommendation::for_severity(severity),
            coord_x,
            coord_y,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::High
    }
}
