// =============================================================================
// Relative Strength Index (RSI) — single-window ratio
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether a series is overbought or oversold.
//
// Step 1 — Take the last `period` price changes (needs `period + 1` closes).
// Step 2 — avg_gain = sum(gains) / period,  avg_loss = sum(losses) / period.
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Unlike the smoothed Wilder variant, no history before the window is carried,
// which keeps each call a pure function of the last `period + 1` closes.
//
// Thresholds:  RSI > 70 => overbought,  RSI < 30 => oversold.
// =============================================================================

/// Neutral value returned when the window cannot be filled.
pub const RSI_NEUTRAL: f64 = 50.0;

/// Default look-back.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Compute the RSI of the most recent `period` transitions in `closes`.
///
/// # Edge cases
/// - `period == 0` or `closes.len() < period + 1` => `50.0`
/// - Average loss exactly zero => `100.0` (this includes a flat window)
/// - Non-finite input => `50.0`
pub fn calculate_rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return RSI_NEUTRAL;
    }

    let window = &closes[closes.len() - period - 1..];
    let (sum_gain, sum_loss) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0_f64, 0.0_f64), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

    let period_f = period as f64;
    rsi_from_averages(sum_gain / period_f, sum_loss / period_f)
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);

    if rsi.is_finite() {
        rsi.clamp(0.0, 100.0)
    } else {
        RSI_NEUTRAL
    }
}
