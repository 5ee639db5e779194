// =============================================================================
// Batch Cache — series accumulated between analysis cycles
// =============================================================================
//
// Lock discipline: a single mutex guards the whole sequence and is held only
// for an append or a snapshot copy.  Nothing is ever called while it is held,
// so a slow or failing analysis handler cannot stall ingestion.
// =============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::market_data::Series;

/// Append-only, ordered store of series shared by the ingestion and cycle
/// loops.  With a non-zero capacity the oldest entries are evicted once the
/// store grows past it; `0` keeps everything.
pub struct BatchCache {
    entries: Mutex<VecDeque<Series>>,
    capacity: usize,
}

impl BatchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append one series at the tail.  Returns how many older entries were
    /// evicted to stay within capacity.
    pub fn append(&self, series: Series) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(series);

        let mut evicted = 0;
        if self.capacity > 0 {
            while entries.len() > self.capacity {
                entries.pop_front();
                evicted += 1;
            }
        }
        evicted
    }

    /// Copy of the full cache in append order.
    pub fn snapshot(&self) -> Vec<Series> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(symbol: &str) -> Series {
        Series::from_prices(symbol, vec![1.0])
    }

    fn symbols(v: &[Series]) -> Vec<&str> {
        v.iter().map(|s| s.symbol.as_str()).collect()
    }

    #[test]
    fn unbounded_cache_keeps_append_order() {
        let cache = BatchCache::new(0);
        for s in ["A", "B", "C", "A"] {
            assert_eq!(cache.append(named(s)), 0);
        }
        assert_eq!(symbols(&cache.snapshot()), vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn bounded_cache_evicts_oldest() {
        let cache = BatchCache::new(2);
        cache.append(named("A"));
        cache.append(named("B"));
        assert_eq!(cache.append(named("C")), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(symbols(&cache.snapshot()), vec!["B", "C"]);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let cache = BatchCache::new(0);
        cache.append(named("A"));
        let snap = cache.snapshot();
        cache.append(named("B"));
        assert_eq!(snap.len(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = BatchCache::new(10);
        assert!(cache.is_empty());
        assert!(cache.snapshot().is_empty());
    }
}
