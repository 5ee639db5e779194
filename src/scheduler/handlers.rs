// =============================================================================
// Scheduler hooks — analysis and notification capabilities
// =============================================================================
//
// Each hook is registered once and invoked many times from a scheduler loop
// thread.  Plain closures work through the blanket impls below.
// =============================================================================

use crate::engine::IndicatorResult;
use crate::market_data::Series;

/// Called by the cycle loop with a snapshot of the batch cache.
///
/// By convention an implementation runs the indicator engine over the batch
/// and pushes the results onto the scheduler's output queue.
pub trait AnalysisHandler: Send + Sync {
    fn on_cycle(&self, batch: &[Series]);
}

/// Called by the dispatch loop for every BUY or SELL result.
pub trait SignalHandler: Send + Sync {
    fn on_signal(&self, result: &IndicatorResult);
}

impl<F> AnalysisHandler for F
where
    F: Fn(&[Series]) + Send + Sync,
{
    fn on_cycle(&self, batch: &[Series]) {
        self(batch)
    }
}

impl<F> SignalHandler for F
where
    F: Fn(&IndicatorResult) + Send + Sync,
{
    fn on_signal(&self, result: &IndicatorResult) {
        self(result)
    }
}
