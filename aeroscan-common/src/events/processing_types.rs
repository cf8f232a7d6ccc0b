//! Processing workflow type definitions
//!
//! Supporting types for simulated processing progress events.

use serde::{Deserialize, Serialize};

/// Snapshot of the processing script's position, sent with every phase event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseProgressData {
    /// Zero-based index of the phase that just started
    pub index: usize,
    /// Total number of phases in the script
    pub total: usize,
    /// Human-readable phase label
    pub label: String,
    /// Fraction of the script covered once this phase finishes (0.0 - 1.0)
    pub fraction: f64,
}

impl PhaseProgressData {
    pub fn new(index: usize, total: usize, label: impl Into<String>) -> Self {
        let fraction = if total > 0 {
            (index + 1) as f64 / total as f64
        } else {
            0.0
        };
        Self {
            index,
            total,
            label: label.into(),
            fraction,
        }
    }
}

/// Headline metric shown once processing completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetric {
    pub title: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_counts_current_phase_as_done() {
        let first = PhaseProgressData::new(0, 7, "Reading drone data...");
        assert!((first.fraction - 1.0 / 7.0).abs() < 1e-12);

        let last = PhaseProgressData::new(6, 7, "Generating report...");
        assert!((last.fraction - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_script_fraction_is_zero() {
        assert_eq!(PhaseProgressData::new(0, 0, "").fraction, 0.0);
    }
}
