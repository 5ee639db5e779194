// =============================================================================
// Indicator Engine — per-series computation and parallel batch fan-out
// =============================================================================
//
// Pipeline for one series:
//   1. Empty prices short-circuit to HOLD / 0.0
//   2. SMA fast + slow, RSI, MACD
//   3. Majority-vote signal
//   4. Strength score
//
// Batch computation partitions the input across a transient rayon pool.  Each
// series is read-only and each result lands in the slot matching its input
// index, so the output is identical to a sequential pass for any worker count.
// =============================================================================

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::indicators::{calculate_macd, calculate_rsi, calculate_sma};
use crate::indicators::macd::{DEFAULT_FAST_SPAN, DEFAULT_SIGNAL_RATIO, DEFAULT_SLOW_SPAN};
use crate::indicators::rsi::DEFAULT_RSI_PERIOD;
use crate::market_data::Series;
use crate::signals::{generate_signal, signal_strength};
use crate::types::Signal;

fn default_sma_fast() -> usize {
    20
}

fn default_sma_slow() -> usize {
    50
}

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

fn default_macd_fast() -> usize {
    DEFAULT_FAST_SPAN
}

fn default_macd_slow() -> usize {
    DEFAULT_SLOW_SPAN
}

fn default_signal_ratio() -> f64 {
    DEFAULT_SIGNAL_RATIO
}

/// Look-back windows for every indicator the engine evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_sma_fast")]
    pub sma_fast: usize,

    #[serde(default = "default_sma_slow")]
    pub sma_slow: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    /// Signal line as a fraction of the MACD line.
    #[serde(default = "default_signal_ratio")]
    pub macd_signal_ratio: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_fast: default_sma_fast(),
            sma_slow: default_sma_slow(),
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal_ratio: default_signal_ratio(),
        }
    }
}

/// Indicator values and the resulting decision for one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub symbol: String,
    pub sma_fast: f64,
    pub sma_slow: f64,
    /// Always within [0, 100].
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub signal: Signal,
    /// Always within [0, 100].
    pub strength: f64,
}

impl IndicatorResult {
    /// Result for a series that has no prices yet.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            signal: Signal::Hold,
            strength: 0.0,
            ..Self::default()
        }
    }
}

/// Stateless indicator engine.  Cloning is cheap; it only carries parameters.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: IndicatorParams,
    /// Worker count for batch fan-out.  `0` means available parallelism.
    workers: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(IndicatorParams::default())
    }
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params, workers: 0 }
    }

    /// Fix the fan-out width.  `0` restores the hardware default.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Number of workers a batch will be spread over (never less than 1).
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Compute all indicators and the signal for a single series.
    pub fn compute_one(&self, series: &Series) -> IndicatorResult {
        if series.prices.is_empty() {
            return IndicatorResult::empty(series.symbol.as_str());
        }

        let p = &self.params;
        let prices = &series.prices;
        let macd = calculate_macd(prices, p.macd_fast, p.macd_slow, p.macd_signal_ratio);

        let mut result = IndicatorResult {
            symbol: series.symbol.clone(),
            sma_fast: calculate_sma(prices, p.sma_fast),
            sma_slow: calculate_sma(prices, p.sma_slow),
            rsi: calculate_rsi(prices, p.rsi_period),
            macd: macd.line,
            macd_signal: macd.signal,
            signal: Signal::Hold,
            strength: 0.0,
        };

        result.signal = generate_signal(&result);
        result.strength = signal_strength(&result);
        result
    }

    /// Compute every series one after another on the calling thread.
    pub fn compute_sequential(&self, batch: &[Series]) -> Vec<IndicatorResult> {
        batch.iter().map(|s| self.compute_one(s)).collect()
    }

    /// Compute a batch in parallel.  `result[i]` always belongs to `batch[i]`.
    ///
    /// A pool is built per call and torn down on return.  If the pool cannot be
    /// created the batch is computed sequentially instead.
    pub fn compute_batch(&self, batch: &[Series]) -> Vec<IndicatorResult> {
        let workers = self.worker_count();
        if batch.len() < 2 || workers == 1 {
            return self.compute_sequential(batch);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("indicator-worker-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, workers, "failed to build worker pool, computing sequentially");
                return self.compute_sequential(batch);
            }
        };

        debug!(series = batch.len(), workers, "fanning out indicator batch");

        let mut results = Vec::with_capacity(batch.len());
        pool.install(|| {
            batch
                .par_iter()
                .map(|s| self.compute_one(s))
                .collect_into_vec(&mut results);
        });
        results
    }
}
