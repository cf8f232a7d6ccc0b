//! Filtering and aggregation over project data
//!
//! Everything here is a pure function of the defect table; the dashboard
//! table, the charts and the report summary are all derived from it.

use aeroscan_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{DefectRecord, DefectType, Severity};

/// Default histogram bin width (cm)
pub const DEFAULT_BIN_WIDTH_CM: f64 = 5.0;

/// Narrowest accepted histogram bin (cm)
pub const MIN_BIN_WIDTH_CM: f64 = 0.1;

/// Upper bound on the number of histogram bins
pub const MAX_HISTOGRAM_BINS: usize = 1000;

/// Column filter on the defect table
///
/// `None` on a column means "no restriction". An empty list matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectFilter {
    pub types: Option<Vec<DefectType>>,
    pub severities: Option<Vec<Severity>>,
}

impl DefectFilter {
    pub fn matches(&self, record: &DefectRecord) -> bool {
        let type_ok = self
            .types
            .as_ref()
            .map_or(true, |types| types.contains(&record.defect_type));
        let severity_ok = self
            .severities
            .as_ref()
            .map_or(true, |severities| severities.contains(&record.severity));
        type_ok && severity_ok
    }

    /// Matching records in their original order
    pub fn apply<'a>(&self, records: &'a [DefectRecord]) -> Vec<&'a DefectRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Distinct defect types present, in first-seen order (filter defaults)
pub fn type_options(records: &[DefectRecord]) -> Vec<DefectType> {
    let mut seen = Vec::new();
    for record in records {
        if !seen.contains(&record.defect_type) {
            seen.push(record.defect_type);
        }
    }
    seen
}

/// Distinct severities present, in first-seen order (filter defaults)
pub fn severity_options(records: &[DefectRecord]) -> Vec<Severity> {
    let mut seen = Vec::new();
    for record in records {
        if !seen.contains(&record.severity) {
            seen.push(record.severity);
        }
    }
    seen
}

/// One slice of the category pie chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub defect_type: DefectType,
    pub label: &'static str,
    pub count: usize,
    /// Share of all records, 0.0 - 1.0
    pub share: f64,
}

/// Counts per defect type, most frequent first; absent types are omitted
pub fn category_distribution(records: &[DefectRecord]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<DefectType, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.defect_type).or_default() += 1;
    }

    let total = records.len();
    let mut distribution: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(defect_type, count)| CategoryCount {
            defect_type,
            label: defect_type.label(),
            count,
            share: count as f64 / total as f64,
        })
        .collect();
    // Stable sort keeps enum order among equal counts
    distribution.sort_by(|a, b| b.count.cmp(&a.count));
    distribution
}

/// One depth bin `[lower, upper)` with per-severity counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub counts: BTreeMap<Severity, usize>,
}

impl HistogramBin {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Depth histogram coloured by severity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthHistogram {
    pub bin_width: f64,
    pub bins: Vec<HistogramBin>,
}

/// Bins of `bin_width` needed to reach `max_depth`; `None` past [`MAX_HISTOGRAM_BINS`]
fn bin_count_for(max_depth: f64, bin_width: f64) -> Option<usize> {
    let bins = (max_depth / bin_width).floor() + 1.0;
    (bins.is_finite() && bins >= 1.0 && bins <= MAX_HISTOGRAM_BINS as f64).then(|| bins as usize)
}

fn max_depth(records: &[DefectRecord]) -> f64 {
    records.iter().map(|r| r.depth_cm).fold(0.0, f64::max)
}

/// Validate a requested bin width against the records it will bin
pub fn check_bin_width(records: &[DefectRecord], bin_width: f64) -> Result<()> {
    if !bin_width.is_finite() || bin_width < MIN_BIN_WIDTH_CM {
        return Err(Error::InvalidInput(format!(
            "bin_width must be at least {} cm, got {}",
            MIN_BIN_WIDTH_CM, bin_width
        )));
    }
    if bin_count_for(max_depth(records), bin_width).is_none() {
        return Err(Error::InvalidInput(format!(
            "bin_width {} cm needs more than {} bins",
            bin_width, MAX_HISTOGRAM_BINS
        )));
    }
    Ok(())
}

/// Bin depths into fixed-width bins starting at 0
///
/// Bins run up to the deepest record. A non-finite or non-positive
/// `bin_width` falls back to [`DEFAULT_BIN_WIDTH_CM`]; narrower widths are
/// raised to [`MIN_BIN_WIDTH_CM`] and widened further when the bin count
/// would exceed [`MAX_HISTOGRAM_BINS`].
pub fn depth_histogram(records: &[DefectRecord], bin_width: f64) -> DepthHistogram {
    let mut bin_width = if bin_width.is_finite() && bin_width > 0.0 {
        bin_width.max(MIN_BIN_WIDTH_CM)
    } else {
        DEFAULT_BIN_WIDTH_CM
    };

    let max_depth = max_depth(records);
    let bin_count = if records.is_empty() {
        0
    } else {
        match bin_count_for(max_depth, bin_width) {
            Some(count) => count,
            None => {
                bin_width = max_depth / (MAX_HISTOGRAM_BINS - 1) as f64;
                bin_count_for(max_depth, bin_width).unwrap_or(0)
            }
        }
    };

    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: i as f64 * bin_width,
            upper: (i + 1) as f64 * bin_width,
            counts: BTreeMap::new(),
        })
        .collect();

    let last = bin_count.saturating_sub(1);
    for record in records {
        let index = ((record.depth_cm / bin_width).floor() as usize).min(last);
        if let Some(bin) = bins.get_mut(index) {
            *bin.counts.entry(record.severity).or_default() += 1;
        }
    }

    DepthHistogram { bin_width, bins }
}

/// Headline numbers for the dashboard and report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total: usize,
    /// High-severity records
    pub critical: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub max_depth_cm: f64,
    pub mean_depth_cm: f64,
}

impl SummaryMetrics {
    pub fn from_records(records: &[DefectRecord]) -> Self {
        let mut by_severity = BTreeMap::new();
        for severity in Severity::ALL {
            by_severity.insert(severity, 0);
        }
        for record in records {
            *by_severity.entry(record.severity).or_default() += 1;
        }

        let total = records.len();
        let depth_sum: f64 = records.iter().map(|r| r.depth_cm).sum();
        Self {
            total,
            critical: by_severity.get(&Severity::High).copied().unwrap_or(0),
            by_severity,
            max_depth_cm: records.iter().map(|r| r.depth_cm).fold(0.0, f64::max),
            mean_depth_cm: if total > 0 {
                depth_sum / total as f64
            } else {
                0.0
            },
        }
    }
}
