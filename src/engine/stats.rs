//! Engine-level request counters and latency history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Rolling latency window size.
const HISTORY_CAPACITY: usize = 1000;

/// Snapshot of engine performance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Over the rolling window of the last 1000 computed requests.
    pub average_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

pub(crate) struct RuntimeCounters {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    history: Mutex<VecDeque<u64>>,
}

impl RuntimeCounters {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
        }
    }

    pub fn count_request(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a computed (non-cache-hit) request outcome.
    pub fn record_outcome(&self, latency_ms: u64, success: bool) {
        if success {
            self.successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(latency_ms);
    }

    pub fn snapshot(&self) -> PerformanceStats {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let (sum, min, max) = history.iter().fold((0u64, u64::MAX, 0u64), |acc, &ms| {
            (acc.0 + ms, acc.1.min(ms), acc.2.max(ms))
        });
        PerformanceStats {
            total_requests: self.total.load(Ordering::Relaxed),
            successful_requests: self.successful.load(Ordering::Relaxed),
            failed_requests: self.failed.load(Ordering::Relaxed),
            average_latency_ms: if history.is_empty() {
                0.0
            } else {
                sum as f64 / history.len() as f64
            },
            min_latency_ms: if history.is_empty() { 0 } else { min },
            max_latency_ms: max,
        }
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.successful.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_split_success_and_failure() {
        let counters = RuntimeCounters::new();
        counters.count_request();
        counters.count_request();
        counters.record_outcome(10, true);
        counters.record_outcome(30, false);

        let stats = counters.snapshot();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.min_latency_ms, 10);
        assert_eq!(stats.max_latency_ms, 30);
        assert!((stats.average_latency_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn history_window_is_bounded() {
        let counters = RuntimeCounters::new();
        for i in 0..1100u64 {
            counters.record_outcome(i, true);
        }
        let stats = counters.snapshot();
        // Only the last 1000 samples (100..1099) remain.
        assert_eq!(stats.min_latency_ms, 100);
        assert_eq!(stats.max_latency_ms, 1099);
    }

    #[test]
    fn reset_clears_everything() {
        let counters = RuntimeCounters::new();
        counters.count_request();
        counters.record_outcome(5, true);
        counters.reset();
        assert_eq!(counters.snapshot(), PerformanceStats::default());
    }
}
