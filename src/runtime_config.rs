// =============================================================================
// Runtime Configuration — scanner settings loaded from JSON
// =============================================================================
//
// Every tunable of the scanner lives here: the symbol universe, the feeder and
// cycle cadences, scheduler back-off, fan-out width and indicator windows.
//
// All fields carry `#[serde(default = "...")]` so that a partial or older
// config file always loads; anything missing takes its default.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::IndicatorParams;
use crate::scheduler::SchedulerConfig;
use crate::types::SourceKind;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    ["IBM", "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "META", "NVDA", "JPM", "V"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_cycle_interval_secs() -> u64 {
    3600
}

fn default_fetch_interval_secs() -> u64 {
    5
}

fn default_poll_slice_ms() -> u64 {
    100
}

fn default_dispatch_backoff_ms() -> u64 {
    100
}

fn default_history_len() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    5
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Universe & source --------------------------------------------------

    /// Symbols fetched on every feeder round.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default)]
    pub source: SourceKind,

    /// Daily points kept per series from the HTTP source.
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fixed seed for the synthetic source.  Unset draws from entropy.
    #[serde(default)]
    pub synthetic_seed: Option<u64>,

    // --- Cadence ------------------------------------------------------------

    /// Time between the starts of two analysis cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Time between two feeder rounds.
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,

    /// Wait granularity of the cycle loop; bounds shutdown latency.
    #[serde(default = "default_poll_slice_ms")]
    pub poll_slice_ms: u64,

    /// Dispatch loop sleep when no results are queued.
    #[serde(default = "default_dispatch_backoff_ms")]
    pub dispatch_backoff_ms: u64,

    // --- Capacity -----------------------------------------------------------

    /// Indicator fan-out width.  0 = available parallelism.
    #[serde(default)]
    pub worker_threads: usize,

    /// Maximum cached series.  Unset keeps one feeder round (one series per
    /// symbol); `0` = unbounded.
    #[serde(default)]
    pub cache_capacity: Option<usize>,

    // --- Indicators ---------------------------------------------------------

    #[serde(default)]
    pub indicators: IndicatorParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            source: SourceKind::default(),
            history_len: default_history_len(),
            request_timeout_secs: default_request_timeout_secs(),
            synthetic_seed: None,
            cycle_interval_secs: default_cycle_interval_secs(),
            fetch_interval_secs: default_fetch_interval_secs(),
            poll_slice_ms: default_poll_slice_ms(),
            dispatch_backoff_ms: default_dispatch_backoff_ms(),
            worker_threads: 0,
            cache_capacity: None,
            indicators: IndicatorParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scanner config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            source = %config.source,
            "scanner config loaded"
        );

        Ok(config)
    }

    /// Replace the symbol list from a comma-separated string.  Blank entries
    /// are dropped; an entirely blank string leaves the list untouched.
    pub fn apply_symbol_override(&mut self, raw: &str) {
        let symbols: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !symbols.is_empty() {
            self.symbols = symbols;
        }
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cache bound handed to the scheduler.  The cache is never drained, so
    /// without an explicit setting it holds only the latest feeder round.
    pub fn effective_cache_capacity(&self) -> usize {
        self.cache_capacity.unwrap_or_else(|| self.symbols.len().max(1))
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            cycle_interval: Duration::from_secs(self.cycle_interval_secs.max(1)),
            poll_slice: Duration::from_millis(self.poll_slice_ms.max(1)),
            dispatch_backoff: Duration::from_millis(self.dispatch_backoff_ms.max(1)),
            cache_capacity: self.effective_cache_capacity(),
        }
    }
}
