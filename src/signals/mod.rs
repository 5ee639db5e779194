// =============================================================================
// Signals Module
// =============================================================================
//
// Turns a computed indicator set into a trading decision:
// - Majority vote across RSI, MACD and SMA crossover
// - Strength score for ranking actionable signals

pub mod majority_vote;

pub use majority_vote::{generate_signal, signal_strength};
