// =============================================================================
// Signal Scanner — Main Entry Point
// =============================================================================
//
// Wires config, logging, the data source, the indicator engine and the
// scheduler, then runs until Ctrl+C.  The scheduler's loops are plain OS
// threads; the Tokio runtime only hosts the feeder and signal handling.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod engine;
mod indicators;
mod market_data;
mod notify;
mod runtime_config;
mod scheduler;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::engine::IndicatorEngine;
use crate::market_data::{run_feeder, AlphaVantageSource, DataSource, Series, SyntheticSource};
use crate::notify::LogNotifier;
use crate::runtime_config::RuntimeConfig;
use crate::scheduler::Scheduler;
use crate::types::SourceKind;

const DEFAULT_CONFIG_PATH: &str = "scanner_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Signal Scanner starting up");

    let config_path =
        std::env::var("SCANNER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    if let Ok(syms) = std::env::var("SCANNER_SYMBOLS") {
        config.apply_symbol_override(&syms);
    }

    info!(
        symbols = ?config.symbols,
        source = %config.source,
        cycle_interval_secs = config.cycle_interval_secs,
        fetch_interval_secs = config.fetch_interval_secs,
        cache_capacity = config.effective_cache_capacity(),
        "Configured scanner"
    );

    // ── 2. Data source ───────────────────────────────────────────────────
    let source: Arc<dyn DataSource> = match config.source {
        SourceKind::AlphaVantage => {
            let api_key = std::env::var("ALPHAVANTAGE_API_KEY").unwrap_or_default();
            if api_key.is_empty() {
                warn!("ALPHAVANTAGE_API_KEY not set; requests will fall back to synthetic data");
            }
            Arc::new(AlphaVantageSource::new(
                api_key,
                tokio::runtime::Handle::current(),
                config.request_timeout(),
                config.history_len,
            )?)
        }
        SourceKind::Synthetic => {
            let synthetic = match config.synthetic_seed {
                Some(seed) => SyntheticSource::seeded(seed),
                None => SyntheticSource::new(),
            };
            if config.history_len > 0 {
                Arc::new(synthetic.with_points(config.history_len))
            } else {
                Arc::new(synthetic)
            }
        }
    };

    // ── 3. Indicator engine ──────────────────────────────────────────────
    let engine = IndicatorEngine::new(config.indicators.clone()).with_workers(config.worker_threads);
    info!(workers = engine.worker_count(), params = ?engine.params(), "Indicator engine ready");

    // ── 4. Scheduler ─────────────────────────────────────────────────────
    let scheduler = Arc::new(Scheduler::new(config.scheduler_config()));

    let output = scheduler.output();
    scheduler.set_analysis_handler(move |batch: &[Series]| {
        let results = engine.compute_batch(batch);
        let actionable = results.iter().filter(|r| r.signal.is_actionable()).count();
        info!(series = results.len(), actionable, "Batch analysed");
        for result in results {
            output.push(result);
        }
    });
    scheduler.set_signal_handler(LogNotifier::new());

    scheduler.start().context("failed to start scheduler")?;

    // ── 5. Feeder ────────────────────────────────────────────────────────
    let feeder = tokio::spawn(run_feeder(
        source,
        config.symbols.clone(),
        scheduler.intake(),
        config.fetch_interval(),
    ));

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping gracefully");

    // `stop` joins OS threads; keep it off the async workers.
    let stopping = scheduler.clone();
    tokio::task::spawn_blocking(move || stopping.stop())
        .await
        .context("scheduler shutdown task failed")?;

    feeder.abort();
    if let Err(e) = feeder.await {
        if !e.is_cancelled() {
            warn!(error = %e, "feeder task ended abnormally");
        }
    }

    info!(
        cycles = scheduler.cycles_completed(),
        signals = scheduler.signals_dispatched(),
        "Signal Scanner shut down complete"
    );
    Ok(())
}
