// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators evaluated for each
// series.  Insufficient data is not an error here: every public function
// resolves it to a documented neutral value (SMA 0.0, RSI 50.0, MACD (0, 0)) so
// the batch engine never has to branch on missing data.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
