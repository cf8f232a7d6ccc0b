//! Synthetic defect generator
//!
//! Produces a reproducible table of fabricated defect records. For a given
//! seed and count the output is identical on every call: values and order.
//!
//! Per record the random stream is consumed in a fixed order:
//! category, depth, width, easting, northing. The stream comes from
//! `ChaCha8Rng`, whose output is fixed across platforms and rand releases.

use aeroscan_common::{Error, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::{DefectRecord, DefectType};

/// Seed used by the "sample data" and "start processing" actions
pub const SAMPLE_SEED: u64 = 42;

/// Records generated per project in the demo
pub const SAMPLE_DEFECT_COUNT: usize = 27;

/// Survey bounding box, planar metres
pub const COORD_X_RANGE: (f64, f64) = (125_000.0, 127_000.0);
pub const COORD_Y_RANGE: (f64, f64) = (456_000.0, 458_000.0);

/// Generate `count` defect records from `seed`
///
/// Fails with [`Error::GenerationFailure`] when the result would be empty.
pub fn generate(seed: u64, count: usize) -> Result<Vec<DefectRecord>> {
    if count == 0 {
        return Err(Error::GenerationFailure(format!(
            "seed {} with count 0 yields no defect records",
            seed
        )));
    }
    let max_id = u32::try_from(count).map_err(|_| {
        Error::GenerationFailure(format!("count {} exceeds the id range", count))
    })?;

    let weights = DefectType::ALL.map(DefectType::probability);
    let categories = WeightedIndex::new(weights)
        .map_err(|e| Error::Internal(format!("invalid category weights: {}", e)))?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let records: Vec<DefectRecord> = (1..=max_id)
        .map(|id| {
            let defect_type = DefectType::ALL[categories.sample(&mut rng)];
            let range = defect_type.range();

            let depth = round_to(rng.gen_range(range.depth.0..range.depth.1), 1);
            let width = round_to(rng.gen_range(range.width.0..range.width.1), 1);
            let coord_x = round_to(rng.gen_range(COORD_X_RANGE.0..COORD_X_RANGE.1), 2);
            let coord_y = round_to(rng.gen_range(COORD_Y_RANGE.0..COORD_Y_RANGE.1), 2);

            DefectRecord::new(id, defect_type, depth, width, coord_x, coord_y)
        })
        .collect();

    debug!(seed, count = records.len(), "Generated synthetic defect records");
    Ok(records)
}

/// Round half away from zero to `places` decimal places
fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
