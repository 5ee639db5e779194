use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Price / volume history for one symbol, oldest first.
///
/// `volumes` and `timestamps` are either empty or exactly as long as `prices`.
/// An empty `prices` is valid and means "no data yet".  A series is never
/// mutated once built; ownership moves through the intake queue into the
/// scheduler's batch cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
    pub timestamps: Vec<f64>,
}

impl Series {
    /// Build a series, rejecting volume/timestamp columns that do not line up
    /// with `prices`.
    pub fn new(
        symbol: impl Into<String>,
        prices: Vec<f64>,
        volumes: Vec<f64>,
        timestamps: Vec<f64>,
    ) -> Result<Self> {
        let symbol = symbol.into();
        ensure!(
            volumes.is_empty() || volumes.len() == prices.len(),
            "{symbol}: {} volumes for {} prices",
            volumes.len(),
            prices.len()
        );
        ensure!(
            timestamps.is_empty() || timestamps.len() == prices.len(),
            "{symbol}: {} timestamps for {} prices",
            timestamps.len(),
            prices.len()
        );

        Ok(Self {
            symbol,
            prices,
            volumes,
            timestamps,
        })
    }

    /// Price-only series.
    pub fn from_prices(symbol: impl Into<String>, prices: Vec<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            prices,
            volumes: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Most recent price, if any.
    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_aligned_columns() {
        let s = Series::new("IBM", vec![1.0, 2.0], vec![10.0, 20.0], vec![0.0, 1.0]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.last_price(), Some(2.0));
    }

    #[test]
    fn new_accepts_missing_optional_columns() {
        let s = Series::new("IBM", vec![1.0, 2.0], vec![], vec![]).unwrap();
        assert!(s.volumes.is_empty());
        assert!(s.timestamps.is_empty());
    }

    #[test]
    fn new_rejects_misaligned_volumes() {
        let err = Series::new("IBM", vec![1.0, 2.0], vec![10.0], vec![]).unwrap_err();
        assert!(err.to_string().contains("volumes"));
    }

    #[test]
    fn new_rejects_misaligned_timestamps() {
        assert!(Series::new("IBM", vec![1.0], vec![], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn empty_series_is_valid() {
        let s = Series::new("AAPL", vec![], vec![], vec![]).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.last_price(), None);
        assert_eq!(s.symbol, "AAPL");
    }
}
