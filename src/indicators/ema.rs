// =============================================================================
// Exponential Moving Average (EMA) — tail-seeded
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (span + 1)
//   EMA_t      = EMA_{t-1} + (close_t - EMA_{t-1}) * multiplier
//
// The recurrence is seeded with the close sitting `span` places from the end of
// the series (not with an SMA), then iterated over the remaining `span - 1`
// closes.  Only the final value is produced.
// =============================================================================

/// Smoothing multiplier for a given span.
pub fn multiplier(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA of the last `span` closes.
///
/// Returns `None` when `span == 0` or fewer than `span` closes exist.
pub fn tail_ema(closes: &[f64], span: usize) -> Option<f64> {
    if span == 0 || closes.len() < span {
        return None;
    }

    let k = multiplier(span);
    let start = closes.len() - span;
    let seed = closes[start];

    Some(
        closes[start + 1..]
            .iter()
            .fold(seed, |ema, &close| ema + (close - ema) * k),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(tail_ema(&[], 5).is_none());
    }

    #[test]
    fn ema_span_zero() {
        assert!(tail_ema(&[1.0, 2.0, 3.0], 0).is_none());
    }

    #[test]
    fn ema_insufficient_data() {
        assert!(tail_ema(&[1.0, 2.0], 5).is_none());
    }

    #[test]
    fn ema_span_one_is_last_close() {
        assert_eq!(tail_ema(&[3.0, 7.0, 9.0], 1), Some(9.0));
    }

    #[test]
    fn ema_known_values() {
        // span 3 over [.., 2, 4, 8]: seed 2, k = 0.5 => 3.0 => 5.5
        let closes = vec![100.0, 2.0, 4.0, 8.0];
        let ema = tail_ema(&closes, 3).unwrap();
        assert!((ema - 5.5).abs() < 1e-10, "got {ema}");
    }

    #[test]
    fn ema_flat_series_is_flat() {
        let ema = tail_ema(&[42.0; 40], 26).unwrap();
        assert!((ema - 42.0).abs() < 1e-10);
    }

    #[test]
    fn multiplier_matches_definition() {
        assert!((multiplier(12) - 2.0 / 13.0).abs() < 1e-15);
        assert!((multiplier(26) - 2.0 / 27.0).abs() < 1e-15);
    }
}
