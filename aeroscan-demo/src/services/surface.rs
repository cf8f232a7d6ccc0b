//! Height-field synthesizer for the 3D road view
//!
//! Builds a smooth trigonometric road surface, carves a few seeded
//! depressions into it and places markers for up to three high-severity
//! defects.
//!
//! Marker placement folds survey coordinates into the grid extents with a
//! modulo. This only makes the markers land somewhere plausible on the
//! rendered road; it is not a coordinate transform and carries no
//! geospatial meaning.

use rand_chacha::ChaCha8Rng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::models::{DefectRecord, DefectType, Severity};

/// Grid extent along the road (metres)
pub const X_RANGE: (f64, f64) = (-50.0, 50.0);
/// Grid extent across the road (metres)
pub const Y_RANGE: (f64, f64) = (-20.0, 20.0);
pub const X_SAMPLES: usize = 100;
pub const Y_SAMPLES: usize = 50;

/// Centres of the carved depressions, in grid coordinates
pub const DEPRESSION_CENTRES: [(f64, f64); 3] = [(-30.0, -5.0), (10.0, 8.0), (35.0, -12.0)];
/// Depressions lower a square window of this many samples per side
pub const DEPRESSION_WINDOW: usize = 10;
pub const DEPRESSION_DEPTH: (f64, f64) = (1.0, 3.0);

pub const MAX_MARKERS: usize = 3;

/// Highlighted defect placed on the surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectMarker {
    pub defect_id: u32,
    pub defect_type: DefectType,
    pub severity: Severity,
    pub depth_cm: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Marker diameter for the chart, derived from defect width
    pub size: f64,
}

/// Elevation grid; `z[row][col]` is the height at `(xs[col], ys[row])`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightField {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub z: Vec<Vec<f64>>,
    pub markers: Vec<DefectMarker>,
}

impl HeightField {
    pub fn elevation_at(&self, row: usize, col: usize) -> Option<f64> {
        self.z.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn min_elevation(&self) -> f64 {
        self.z
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_elevation(&self) -> f64 {
        self.z
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Smooth base elevation before any depression is carved
pub fn base_elevation(x: f64, y: f64) -> f64 {
    0.1 * (0.3 * x).sin() * (0.2 * y).cos()
}

/// Build the surface for `seed`, highlighting critical defects from `records`
pub fn synthesize_surface(seed: u64, records: &[DefectRecord]) -> HeightField {
    let xs = linspace(X_RANGE.0, X_RANGE.1, X_SAMPLES);
    let ys = linspace(Y_RANGE.0, Y_RANGE.1, Y_SAMPLES);

    let mut z: Vec<Vec<f64>> = ys
        .iter()
        .map(|&y| xs.iter().map(|&x| base_elevation(x, y)).collect())
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let half = DEPRESSION_WINDOW / 2;
    for &(xc, yc) in DEPRESSION_CENTRES.iter() {
        let col = nearest_index(&xs, xc);
        let row = nearest_index(&ys, yc);
        let offset = rng.gen_range(DEPRESSION_DEPTH.0..DEPRESSION_DEPTH.1);

        let rows = row.saturating_sub(half)..(row + half).min(ys.len());
        let cols = col.saturating_sub(half)..(col + half).min(xs.len());
        for r in rows {
            for c in cols.clone() {
                z[r][c] -= offset;
            }
        }
    }

    let x_span = X_RANGE.1 - X_RANGE.0;
    let y_span = Y_RANGE.1 - Y_RANGE.0;
    let markers = records
        .iter()
        .filter(|r| r.severity == Severity::High)
        .take(MAX_MARKERS)
        .map(|r| DefectMarker {
            defect_id: r.id,
            defect_type: r.defect_type,
            severity: r.severity,
            depth_cm: r.depth_cm,
            x: r.coord_x.rem_euclid(x_span) + X_RANGE.0,
            y: r.coord_y.rem_euclid(y_span) + Y_RANGE.0,
            z: -r.depth_cm / 10.0 - 0.5,
            size: r.width_cm / 5.0,
        })
        .collect();

    HeightField { xs, ys, z, markers }
}

/// `count` evenly spaced samples from `start` to `end` inclusive
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Index of the first sample closest to `target`
fn nearest_index(samples: &[f64], target: f64) -> usize {
    samples
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_dist), (i, &v)| {
            let dist = (v - target).abs();
            if dist < best_dist {
                (i, dist)
            } else {
                (best, best_dist)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generator::{generate, SAMPLE_DEFECT_COUNT, SAMPLE_SEED};

    #[test]
    fn test_grid_dimensions() {
        let field = synthesize_surface(SAMPLE_SEED, &[]);
        assert_eq!(field.xs.len(), X_SAMPLES);
        assert_eq!(field.ys.len(), Y_SAMPLES);
        assert_eq!(field.z.len(), Y_SAMPLES);
        assert!(field.z.iter().all(|row| row.len() == X_SAMPLES));
        assert_eq!(field.xs[0], -50.0);
        assert!((field.xs[X_SAMPLES - 1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_surface_is_deterministic() {
        let records = generate(SAMPLE_SEED, SAMPLE_DEFECT_COUNT).unwrap();
        assert_eq!(
            synthesize_surface(SAMPLE_SEED, &records),
            synthesize_surface(SAMPLE_SEED, &records)
        );
    }

    #[test]
    fn test_depressions_are_carved_below_base() {
        let field = synthesize_surface(SAMPLE_SEED, &[]);
        for &(xc, yc) in DEPRESSION_CENTRES.iter() {
            let col = nearest_index(&field.xs, xc);
            let row = nearest_index(&field.ys, yc);
            let carved = field.elevation_at(row, col).unwrap();
            let base = base_elevation(field.xs[col], field.ys[row]);
            let drop = base - carved;
            assert!(
                (DEPRESSION_DEPTH.0..DEPRESSION_DEPTH.1).contains(&drop),
                "drop {} at ({}, {})",
                drop,
                xc,
                yc
            );
        }
        // Base surface never dips below -0.1, so anything carved is well under it
        assert!(field.min_elevation() < -0.9);
        assert!(field.max_elevation() <= 0.1 + 1e-12);
    }

    #[test]
    fn test_untouched_corner_keeps_base_elevation() {
        let field = synthesize_surface(SAMPLE_SEED, &[]);
        let expected = base_elevation(field.xs[0], field.ys[0]);
        assert_eq!(field.elevation_at(0, 0), Some(expected));
    }

    #[test]
    fn test_markers_only_for_first_three_high_severity() {
        let records = generate(SAMPLE_SEED, 200).unwrap();
        let field = synthesize_surface(SAMPLE_SEED, &records);

        let expected_ids: Vec<u32> = records
            .iter()
            .filter(|r| r.severity == Severity::High)
            .take(MAX_MARKERS)
            .map(|r| r.id)
            .collect();
        let ids: Vec<u32> = field.markers.iter().map(|m| m.defect_id).collect();
        assert_eq!(ids, expected_ids);

        for marker in &field.markers {
            assert!((X_RANGE.0..X_RANGE.1).contains(&marker.x));
            assert!((Y_RANGE.0..Y_RANGE.1).contains(&marker.y));
            assert!(marker.z < -2.5, "high severity depth exceeds 20 cm");
        }
    }

    #[test]
    fn test_marker_mapping_folds_coordinates() {
        let record = DefectRecord::new(9, DefectType::Pit, 30.0, 100.0, 125_030.5, 456_010.0);
        let field = synthesize_surface(SAMPLE_SEED, &[record]);
        let marker = &field.markers[0];
        assert!((marker.x - (30.5 - 50.0)).abs() < 1e-9);
        assert!((marker.y - (10.0 - 20.0)).abs() < 1e-9);
        assert!((marker.z - (-3.5)).abs() < 1e-9);
        assert!((marker.size - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_markers_without_high_severity() {
        let low = DefectRecord::new(1, DefectType::Crack, 4.0, 10.0, 125_000.0, 456_000.0);
        assert!(synthesize_surface(SAMPLE_SEED, &[low]).markers.is_empty());
    }

    #[test]
    fn test_nearest_index_prefers_first_on_tie() {
        assert_eq!(nearest_index(&[0.0, 1.0, 2.0], 0.5), 0);
        assert_eq!(nearest_index(&[0.0, 1.0, 2.0], 1.9), 2);
    }
}
