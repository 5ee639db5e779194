// =============================================================================
// Feeder Loop — periodic fetch into the scheduler's intake queue
// =============================================================================
//
// Runs as a background Tokio task, waking every `every` to:
//   1. Fetch all configured symbols from the data source (on the blocking
//      pool, since `DataSource::fetch` is synchronous).
//   2. Push each series onto the intake queue, in symbol order.
//
// The loop exits once the intake queue has been stopped, which happens when
// the scheduler shuts down.
//
//   tokio::spawn(run_feeder(source, symbols, scheduler.intake(), every));
//
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::source::DataSource;
use super::Series;
use crate::scheduler::BlockingQueue;

pub async fn run_feeder(
    source: Arc<dyn DataSource>,
    symbols: Vec<String>,
    intake: Arc<BlockingQueue<Series>>,
    every: Duration,
) {
    info!(symbols = symbols.len(), interval_ms = every.as_millis() as u64, "Feeder started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if intake.is_stopped() {
            break;
        }

        let src = source.clone();
        let syms = symbols.clone();
        let batch = match tokio::task::spawn_blocking(move || src.fetch_batch(&syms)).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "fetch task failed, skipping this round");
                continue;
            }
        };

        if intake.is_stopped() {
            break;
        }

        let fetched = batch.len();
        for series in batch {
            debug!(
                symbol = %series.symbol,
                points = series.len(),
                last = ?series.last_price(),
                "series fetched"
            );
            intake.push(series);
        }
        debug!(fetched, queued = intake.len(), "series pushed to intake");
    }

    info!("Feeder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::SyntheticSource;

    #[tokio::test]
    async fn feeder_pushes_batches_until_intake_stops() {
        let intake = Arc::new(BlockingQueue::new());
        let source: Arc<dyn DataSource> = Arc::new(SyntheticSource::seeded(9).with_points(5));
        let symbols = vec!["IBM".to_string(), "AAPL".to_string()];

        let handle = tokio::spawn(run_feeder(
            source,
            symbols,
            intake.clone(),
            Duration::from_millis(20),
        ));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while intake.len() < 4 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(intake.len() >= 4);

        intake.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("feeder did not exit after stop")
            .unwrap();

        let first = intake.try_pop().unwrap();
        let second = intake.try_pop().unwrap();
        assert_eq!(first.symbol, "IBM");
        assert_eq!(second.symbol, "AAPL");
    }
}
