// =============================================================================
// Scheduler — cycle, ingestion and dispatch loops
// =============================================================================
//
// Three OS threads share one `Shared` block:
//
//   cycle      wakes every `cycle_interval`, snapshots the batch cache and
//              hands the snapshot to the analysis handler.
//   ingestion  blocks on the intake queue and appends each series to the
//              cache.
//   dispatch   polls the output queue, forwarding BUY / SELL results to the
//              signal handler and backing off briefly when it is empty.
//
// Lifecycle:  Idle -> Running -> Stopping -> Idle.  `start` and `stop` are
// serialised by the thread-handle mutex; a second `start` while Running and a
// `stop` while Idle are no-ops.  `stop` raises the stop flag, closes both
// queues so blocked pops return, then joins all three threads.
//
// Handlers run outside the cache lock and inside `catch_unwind`, so a
// panicking handler is logged and the loop carries on.  A handler may call
// `stop`: on a loop thread it only requests shutdown, and the join happens on
// the next `stop` from outside (or on drop).
// =============================================================================

use std::any::Any;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cache::BatchCache;
use super::handlers::{AnalysisHandler, SignalHandler};
use super::queue::BlockingQueue;
use crate::engine::IndicatorResult;
use crate::market_data::Series;
use crate::types::SchedulerState;

/// Timing and retention knobs for the three loops.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the starts of two analysis cycles.
    pub cycle_interval: Duration,
    /// Granularity of the cycle loop's wait; bounds shutdown latency.
    pub poll_slice: Duration,
    /// Dispatch loop sleep when the output queue is empty.
    pub dispatch_backoff: Duration,
    /// Maximum cached series (`0` = unbounded).
    pub cache_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(3600),
            poll_slice: Duration::from_millis(100),
            dispatch_backoff: Duration::from_millis(100),
            cache_capacity: 0,
        }
    }
}

// =============================================================================
// Shared loop state
// =============================================================================

thread_local! {
    /// Address of the `Shared` block whose loop runs on this thread, or 0.
    static LOOP_OWNER: Cell<usize> = const { Cell::new(0) };
}

fn owner_tag(shared: &Arc<Shared>) -> usize {
    Arc::as_ptr(shared) as usize
}

struct Shared {
    config: SchedulerConfig,
    stop_requested: AtomicBool,
    cache: BatchCache,
    intake: Arc<BlockingQueue<Series>>,
    output: Arc<BlockingQueue<IndicatorResult>>,
    analysis: RwLock<Option<Arc<dyn AnalysisHandler>>>,
    notifier: RwLock<Option<Arc<dyn SignalHandler>>>,
    cycles_completed: AtomicU64,
    signals_dispatched: AtomicU64,
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Shared {
    fn should_stop(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Snapshot the cache, release the lock, then run the analysis handler.
    fn run_cycle(&self) {
        // The cache only grows, so a non-empty check holds for the snapshot.
        if self.cache.is_empty() {
            debug!("cycle skipped: cache empty");
            return;
        }
        let batch = self.cache.snapshot();

        let Some(handler) = self.analysis.read().clone() else {
            debug!(series = batch.len(), "cycle skipped: no analysis handler registered");
            return;
        };

        let cycle_id = Uuid::new_v4();
        info!(cycle = %cycle_id, series = batch.len(), "Triggering analysis cycle");

        let started = Instant::now();
        match catch_unwind(AssertUnwindSafe(|| handler.on_cycle(&batch))) {
            Ok(()) => {
                self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                info!(
                    cycle = %cycle_id,
                    elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "Analysis cycle completed"
                );
            }
            Err(payload) => {
                error!(
                    cycle = %cycle_id,
                    reason = %panic_reason(payload.as_ref()),
                    "analysis handler panicked; cycle abandoned"
                );
            }
        }
    }

    /// Forward an actionable result to the signal handler.
    fn dispatch(&self, result: IndicatorResult) {
        if !result.signal.is_actionable() {
            return;
        }

        debug!(
            symbol = %result.symbol,
            signal = %result.signal,
            strength = result.strength,
            "dispatching signal"
        );

        let Some(handler) = self.notifier.read().clone() else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| handler.on_signal(&result))) {
            Ok(()) => {
                self.signals_dispatched.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                error!(
                    symbol = %result.symbol,
                    reason = %panic_reason(payload.as_ref()),
                    "signal handler panicked"
                );
            }
        }
    }
}

fn cycle_loop(shared: Arc<Shared>) {
    info!(
        interval_secs = shared.config.cycle_interval.as_secs_f64(),
        "Cycle loop started"
    );

    while !shared.should_stop() {
        let started = Instant::now();
        shared.run_cycle();

        let deadline = started + shared.config.cycle_interval;
        while !shared.should_stop() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(shared.config.poll_slice.min(deadline - now));
        }
    }

    info!("Cycle loop stopped");
}

fn ingestion_loop(shared: Arc<Shared>) {
    info!("Ingestion loop started");

    while let Ok(series) = shared.intake.pop() {
        let symbol = series.symbol.clone();
        let evicted = shared.cache.append(series);
        if evicted > 0 {
            debug!(%symbol, evicted, "cache at capacity, oldest series evicted");
        }
    }

    info!(cached = shared.cache.len(), "Ingestion loop stopped");
}

fn dispatch_loop(shared: Arc<Shared>) {
    info!("Dispatch loop started");

    while !shared.should_stop() {
        match shared.output.try_pop() {
            Some(result) => shared.dispatch(result),
            None => thread::sleep(shared.config.dispatch_backoff),
        }
    }

    if !shared.output.is_empty() {
        warn!(dropped = shared.output.len(), "Dispatch loop stopped with undelivered results");
    } else {
        info!("Dispatch loop stopped");
    }
}

// =============================================================================
// Scheduler
// =============================================================================

pub struct Scheduler {
    shared: Arc<Shared>,
    state: AtomicU8,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let cache = BatchCache::new(config.cache_capacity);
        Self {
            shared: Arc::new(Shared {
                config,
                stop_requested: AtomicBool::new(false),
                cache,
                intake: Arc::new(BlockingQueue::new()),
                output: Arc::new(BlockingQueue::new()),
                analysis: RwLock::new(None),
                notifier: RwLock::new(None),
                cycles_completed: AtomicU64::new(0),
                signals_dispatched: AtomicU64::new(0),
            }),
            state: AtomicU8::new(SchedulerState::Idle.as_u8()),
            threads: Mutex::new(Vec::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Registration & feed
    // -------------------------------------------------------------------------

    pub fn set_analysis_handler<H: AnalysisHandler + 'static>(&self, handler: H) {
        *self.shared.analysis.write() = Some(Arc::new(handler));
    }

    pub fn set_signal_handler<H: SignalHandler + 'static>(&self, handler: H) {
        *self.shared.notifier.write() = Some(Arc::new(handler));
    }

    /// Append a series straight to the batch cache, bypassing the intake queue.
    pub fn add_series(&self, series: Series) {
        self.shared.cache.append(series);
    }

    /// Queue drained by the ingestion loop.
    pub fn intake(&self) -> Arc<BlockingQueue<Series>> {
        self.shared.intake.clone()
    }

    /// Queue drained by the dispatch loop.
    pub fn output(&self) -> Arc<BlockingQueue<IndicatorResult>> {
        self.shared.output.clone()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Spawn the three loops.  No-op unless Idle.
    ///
    /// If a thread cannot be spawned, any loops already started are stopped
    /// and joined before the error is returned.
    pub fn start(&self) -> Result<()> {
        let mut threads = self.threads.lock();
        if self.state() != SchedulerState::Idle {
            debug!(state = %self.state(), "start ignored");
            return Ok(());
        }

        self.shared.stop_requested.store(false, Ordering::Release);
        self.shared.intake.reset();
        self.shared.output.reset();

        let loops: [(&str, fn(Arc<Shared>)); 3] = [
            ("scheduler-cycle", cycle_loop),
            ("scheduler-ingest", ingestion_loop),
            ("scheduler-dispatch", dispatch_loop),
        ];

        for (name, body) in loops {
            let shared = self.shared.clone();
            let spawned = thread::Builder::new()
                .name(name.to_string())
                .spawn(move || {
                    LOOP_OWNER.with(|owner| owner.set(owner_tag(&shared)));
                    body(shared)
                });

            match spawned {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    self.halt(&mut threads);
                    return Err(e).with_context(|| format!("failed to spawn {name} thread"));
                }
            }
        }

        self.set_state(SchedulerState::Running);
        info!(
            interval_secs = self.shared.config.cycle_interval.as_secs_f64(),
            cache_capacity = self.shared.config.cache_capacity,
            "Scheduler started"
        );
        Ok(())
    }

    /// Stop and join all loops.  Blocks until every thread has exited.  No-op
    /// when Idle.
    ///
    /// Called from one of this scheduler's own loop threads (i.e. from a
    /// handler), it only requests shutdown and returns; the scheduler stays
    /// `Stopping` until `stop` is called again from another thread.
    pub fn stop(&self) {
        if self.on_own_loop_thread() {
            self.request_stop();
            info!("Scheduler stop requested from a loop thread; join deferred");
            return;
        }

        let mut threads = self.threads.lock();
        if self.state() == SchedulerState::Idle {
            return;
        }
        self.halt(&mut threads);
        info!("Scheduler stopped");
    }

    fn on_own_loop_thread(&self) -> bool {
        LOOP_OWNER.with(|owner| owner.get() == owner_tag(&self.shared))
    }

    fn request_stop(&self) {
        self.set_state(SchedulerState::Stopping);
        self.shared.stop_requested.store(true, Ordering::Release);
        self.shared.intake.stop();
        self.shared.output.stop();
    }

    fn halt(&self, threads: &mut Vec<JoinHandle<()>>) {
        self.request_stop();

        for handle in threads.drain(..) {
            let name = handle.thread().name().unwrap_or("scheduler").to_string();
            if handle.join().is_err() {
                error!(thread = %name, "scheduler thread panicked");
            }
        }

        self.set_state(SchedulerState::Idle);
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn cached_len(&self) -> usize {
        self.shared.cache.len()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.shared.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn signals_dispatched(&self) -> u64 {
        self.shared.signals_dispatched.load(Ordering::Relaxed)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IndicatorEngine;
    use crate::types::Signal;
    use std::collections::HashSet;

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            cycle_interval: Duration::from_millis(50),
            poll_slice: Duration::from_millis(10),
            dispatch_backoff: Duration::from_millis(5),
            cache_capacity: 0,
        }
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    fn uptrend(symbol: &str) -> Series {
        Series::from_prices(symbol, (0..60).map(|i| 100.0 + i as f64 * 0.5).collect())
    }

    fn downtrend(symbol: &str) -> Series {
        Series::from_prices(symbol, (0..60).map(|i| 100.0 - i as f64 * 0.1).collect())
    }

    #[test]
    fn stop_without_start_is_noop() {
        let scheduler = Scheduler::default();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn shutdown_is_bounded_without_data() {
        // Hour-long interval: the cycle loop must still notice the stop flag.
        let scheduler = Scheduler::default();
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        scheduler.stop();
        assert!(started.elapsed() < Duration::from_secs(2), "stop took {:?}", started.elapsed());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn second_start_is_noop() {
        let scheduler = Scheduler::new(fast_config());
        scheduler.start().unwrap();
        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        assert_eq!(scheduler.threads.lock().len(), 3);
        scheduler.stop();
        assert!(scheduler.threads.lock().is_empty());
    }

    #[test]
    fn restart_after_stop() {
        let scheduler = Scheduler::new(fast_config());
        scheduler.start().unwrap();
        scheduler.stop();

        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        scheduler.intake().push(uptrend("AGAIN"));
        assert!(wait_until(Duration::from_secs(2), || scheduler.cached_len() == 1));
        scheduler.stop();
    }

    #[test]
    fn intake_series_reach_cache_in_order() {
        let scheduler = Scheduler::new(fast_config());
        scheduler.start().unwrap();

        let intake = scheduler.intake();
        for s in ["A", "B", "C"] {
            intake.push(uptrend(s));
        }
        assert!(wait_until(Duration::from_secs(2), || scheduler.cached_len() == 3));

        let order: Vec<String> = scheduler.shared.cache.snapshot().into_iter().map(|s| s.symbol).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        scheduler.stop();
    }

    #[test]
    fn add_series_appends_directly() {
        let scheduler = Scheduler::default();
        scheduler.add_series(uptrend("X"));
        scheduler.add_series(uptrend("Y"));
        assert_eq!(scheduler.cached_len(), 2);
    }

    #[test]
    fn cache_capacity_is_applied() {
        let scheduler = Scheduler::new(SchedulerConfig {
            cache_capacity: 2,
            ..fast_config()
        });
        for s in ["A", "B", "C"] {
            scheduler.add_series(uptrend(s));
        }
        assert_eq!(scheduler.cached_len(), 2);
    }

    #[test]
    fn missing_handlers_are_noops() {
        let scheduler = Scheduler::new(fast_config());
        scheduler.add_series(uptrend("X"));
        scheduler.output().push(IndicatorResult {
            symbol: "X".into(),
            signal: Signal::Buy,
            ..IndicatorResult::default()
        });
        scheduler.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || scheduler.output().is_empty()));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(scheduler.cycles_completed(), 0);
        assert_eq!(scheduler.signals_dispatched(), 0);
        scheduler.stop();
    }

    #[test]
    fn end_to_end_only_actionable_signals_are_notified() {
        let scheduler = Scheduler::new(fast_config());
        let engine = IndicatorEngine::default().with_workers(2);
        let output = scheduler.output();

        scheduler.set_analysis_handler(move |batch: &[Series]| {
            for result in engine.compute_batch(batch) {
                output.push(result);
            }
        });

        let seen: Arc<Mutex<Vec<IndicatorResult>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        scheduler.set_signal_handler(move |result: &IndicatorResult| {
            sink.lock().push(result.clone());
        });

        scheduler.start().unwrap();
        let intake = scheduler.intake();
        intake.push(uptrend("UP"));
        intake.push(Series::from_prices("FLAT", vec![100.0; 5]));
        intake.push(downtrend("DOWN"));

        let delivered = wait_until(Duration::from_secs(5), || {
            let symbols: HashSet<String> = seen.lock().iter().map(|r| r.symbol.clone()).collect();
            symbols.contains("UP") && symbols.contains("DOWN")
        });
        scheduler.stop();

        assert!(delivered, "expected UP and DOWN notifications");
        let seen = seen.lock();
        assert!(seen.iter().all(|r| r.signal.is_actionable()));
        assert!(seen.iter().all(|r| r.symbol != "FLAT"));
        assert!(seen.iter().any(|r| r.symbol == "UP" && r.signal == Signal::Buy));
        assert!(seen.iter().any(|r| r.symbol == "DOWN" && r.signal == Signal::Sell));
        assert!(scheduler.cycles_completed() >= 1);
    }

    #[test]
    fn panicking_analysis_handler_does_not_stop_cycles() {
        let scheduler = Scheduler::new(fast_config());
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();

        scheduler.set_analysis_handler(move |_batch: &[Series]| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("analysis exploded");
        });
        scheduler.add_series(uptrend("X"));
        scheduler.start().unwrap();

        assert!(wait_until(Duration::from_secs(5), || calls.load(Ordering::SeqCst) >= 3));
        // The cache lock must still be usable after the panics.
        scheduler.add_series(uptrend("Y"));
        assert_eq!(scheduler.cached_len(), 2);
        scheduler.stop();
        assert_eq!(scheduler.cycles_completed(), 0);
    }

    #[test]
    fn panicking_signal_handler_does_not_stop_dispatch() {
        let scheduler = Scheduler::new(fast_config());
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        scheduler.set_signal_handler(move |_r: &IndicatorResult| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("sink exploded");
        });

        scheduler.start().unwrap();
        let output = scheduler.output();
        for symbol in ["A", "B"] {
            output.push(IndicatorResult {
                symbol: symbol.into(),
                signal: Signal::Sell,
                ..IndicatorResult::default()
            });
        }

        assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) == 2));
        scheduler.stop();
    }

    #[test]
    fn stop_from_handler_defers_join() {
        let scheduler = Arc::new(Scheduler::new(fast_config()));
        let handle = Arc::downgrade(&scheduler);
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();

        scheduler.set_analysis_handler(move |_batch: &[Series]| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(s) = handle.upgrade() {
                s.stop();
            }
        });
        scheduler.add_series(uptrend("X"));
        scheduler.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 1));
        assert!(wait_until(Duration::from_secs(2), || !scheduler.is_running()));

        // Joining from outside completes the shutdown.
        let (tx, rx) = std::sync::mpsc::channel();
        let outside = scheduler.clone();
        thread::spawn(move || {
            outside.stop();
            let _ = tx.send(());
        });
        rx.recv_timeout(Duration::from_secs(2))
            .expect("stop after in-handler stop did not return");

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.threads.lock().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_from_other_thread_is_not_deferred() {
        let scheduler = Scheduler::new(fast_config());
        scheduler.start().unwrap();
        assert!(!scheduler.on_own_loop_thread());
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn drop_stops_running_scheduler() {
        let intake;
        {
            let scheduler = Scheduler::new(fast_config());
            scheduler.start().unwrap();
            intake = scheduler.intake();
        }
        assert!(intake.is_stopped());
    }
}
