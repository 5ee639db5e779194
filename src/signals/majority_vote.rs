// =============================================================================
// Majority Vote — three-indicator signal and strength scoring
// =============================================================================
//
// Each indicator casts at most one vote:
//   RSI        < 30 => BUY     > 70 => SELL
//   MACD       above signal => BUY, below => SELL
//   SMA fast   above slow   => BUY, below => SELL
//
// The side with more votes wins; a tie (including no votes) is HOLD.
//
// Strength sums three normalised contributions and is clamped to [0, 100]:
//   RSI distance past its threshold / 30
//   |MACD - signal| * 10
//   |fast - slow| / slow * 100        (skipped when slow == 0)
// =============================================================================

use serde::Serialize;

use crate::engine::IndicatorResult;
use crate::types::Signal;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

const RSI_SCALE: f64 = 30.0;
const MACD_SCALE: f64 = 10.0;
const SMA_SCALE: f64 = 100.0;
const MAX_STRENGTH: f64 = 100.0;

/// Vote counts behind a signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub buy: u8,
    pub sell: u8,
}

impl VoteTally {
    fn cast(&mut self, direction: Option<Signal>) {
        match direction {
            Some(Signal::Buy) => self.buy += 1,
            Some(Signal::Sell) => self.sell += 1,
            _ => {}
        }
    }

    pub fn decision(self) -> Signal {
        match self.buy.cmp(&self.sell) {
            std::cmp::Ordering::Greater => Signal::Buy,
            std::cmp::Ordering::Less => Signal::Sell,
            std::cmp::Ordering::Equal => Signal::Hold,
        }
    }
}

fn rsi_vote(rsi: f64) -> Option<Signal> {
    if rsi < RSI_OVERSOLD {
        Some(Signal::Buy)
    } else if rsi > RSI_OVERBOUGHT {
        Some(Signal::Sell)
    } else {
        None
    }
}

fn crossover_vote(fast: f64, slow: f64) -> Option<Signal> {
    if fast > slow {
        Some(Signal::Buy)
    } else if fast < slow {
        Some(Signal::Sell)
    } else {
        None
    }
}

/// Count the votes of all three indicators.
pub fn tally(result: &IndicatorResult) -> VoteTally {
    let mut votes = VoteTally::default();
    votes.cast(rsi_vote(result.rsi));
    votes.cast(crossover_vote(result.macd, result.macd_signal));
    votes.cast(crossover_vote(result.sma_fast, result.sma_slow));
    votes
}

/// Majority decision over the three indicator votes.
pub fn generate_signal(result: &IndicatorResult) -> Signal {
    tally(result).decision()
}

/// Confidence of the signal in [0, 100].
pub fn signal_strength(result: &IndicatorResult) -> f64 {
    let mut strength = 0.0;

    if result.rsi < RSI_OVERSOLD {
        strength += (RSI_OVERSOLD - result.rsi) / RSI_SCALE;
    } else if result.rsi > RSI_OVERBOUGHT {
        strength += (result.rsi - RSI_OVERBOUGHT) / RSI_SCALE;
    }

    strength += (result.macd - result.macd_signal).abs() * MACD_SCALE;

    if result.sma_slow != 0.0 {
        strength += (result.sma_fast - result.sma_slow).abs() / result.sma_slow.abs() * SMA_SCALE;
    }

    if strength.is_finite() {
        strength.clamp(0.0, MAX_STRENGTH)
    } else {
        0.0
    }
}
