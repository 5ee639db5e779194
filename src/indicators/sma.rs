// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA = (close_{n-period} + ... + close_{n-1}) / period
//
// Only the most recent window matters to the scanner, so a single value is
// returned rather than the full series.

/// Arithmetic mean of the last `period` closes.
///
/// Returns `0.0` when `period == 0` or fewer than `period` closes exist.
pub fn calculate_sma(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period {
        return 0.0;
    }

    let window = &closes[closes.len() - period..];
    window.iter().sum::<f64>() / period as f64
}
