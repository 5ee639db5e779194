// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd   = EMA_fast - EMA_slow          (spans 12 / 26 by default)
//   signal = macd * signal_ratio          (0.9 by default)
//
// The signal line is a fixed proportion of the MACD line rather than a 9-period
// EMA of the MACD history.  Signal votes and strength values downstream depend
// on this exact definition, so it is kept as-is.
// =============================================================================

use super::ema::tail_ema;

pub const DEFAULT_FAST_SPAN: usize = 12;
pub const DEFAULT_SLOW_SPAN: usize = 26;
pub const DEFAULT_SIGNAL_RATIO: f64 = 0.9;

/// MACD line and its (proportional) signal line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
}

/// Compute MACD from the tail of `closes`.
///
/// Returns `Macd { 0.0, 0.0 }` when fewer than `slow_span` closes exist.
pub fn calculate_macd(
    closes: &[f64],
    fast_span: usize,
    slow_span: usize,
    signal_ratio: f64,
) -> Macd {
    match (tail_ema(closes, fast_span), tail_ema(closes, slow_span)) {
        (Some(fast), Some(slow)) => {
            let line = fast - slow;
            Macd {
                line,
                signal: line * signal_ratio,
            }
        }
        _ => Macd::default(),
    }
}
