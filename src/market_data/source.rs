// =============================================================================
// Data Sources — where series come from
// =============================================================================
//
// A `DataSource` never fails: transport errors, malformed payloads and empty
// responses all degrade to a syntactically valid (possibly synthetic) series,
// so nothing downstream needs a missing-data branch.
// =============================================================================

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Series;

/// Supplies series on demand.
pub trait DataSource: Send + Sync {
    /// Fetch the history for one symbol.
    fn fetch(&self, symbol: &str) -> Series;

    /// Fetch several symbols, preserving input order.
    fn fetch_batch(&self, symbols: &[String]) -> Vec<Series> {
        symbols.iter().map(|s| self.fetch(s)).collect()
    }
}

// ---------------------------------------------------------------------------
// SyntheticSource
// ---------------------------------------------------------------------------

/// Number of daily points per generated series.
pub const SYNTHETIC_POINTS: usize = 100;

const PRICE_RANGE: std::ops::Range<f64> = 100.0..200.0;
const VOLUME_RANGE: std::ops::Range<f64> = 1_000_000.0..10_000_000.0;
/// Fraction of the distance to a fresh random draw covered each step.
const PULL: f64 = 0.1;

/// Mean-reverting random walk inside [100, 200) with uniform volumes.
pub struct SyntheticSource {
    rng: Mutex<StdRng>,
    points: usize,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            points: SYNTHETIC_POINTS,
        }
    }

    /// Reproducible generator for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            points: SYNTHETIC_POINTS,
        }
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn generate(&self, symbol: &str) -> Series {
        let mut rng = self.rng.lock();

        let mut prices = Vec::with_capacity(self.points);
        let mut volumes = Vec::with_capacity(self.points);
        let mut timestamps = Vec::with_capacity(self.points);

        let mut price: f64 = rng.gen_range(PRICE_RANGE);
        for day in 0..self.points {
            price += (rng.gen_range(PRICE_RANGE) - price) * PULL;
            prices.push(price);
            volumes.push(rng.gen_range(VOLUME_RANGE));
            timestamps.push(day as f64);
        }

        Series {
            symbol: symbol.to_string(),
            prices,
            volumes,
            timestamps,
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for SyntheticSource {
    fn fetch(&self, symbol: &str) -> Series {
        self.generate(symbol)
    }
}
