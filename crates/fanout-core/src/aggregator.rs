//! Success/failure counters shared between running tasks and the reporter.
//!
//! Recording is a single relaxed `fetch_add`; draining swaps each counter
//! with zero, so an increment racing a drain lands in exactly one window.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::outcome::Outcome;

/// Counts accumulated since the previous drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub successes: u64,
    pub failures: u64,
}

impl WindowCounts {
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.successes == 0 && self.failures == 0
    }
}

#[derive(Debug, Default)]
pub struct OutcomeAggregator {
    successes: AtomicU64,
    failures: AtomicU64,
}

impl OutcomeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, outcome: &Outcome) {
        if outcome.is_success() {
            self.record_success();
        } else {
            self.record_failure();
        }
    }

    /// Read and reset both counters. Each counter's read-reset is atomic;
    /// the pair is not read as one snapshot.
    pub fn drain(&self) -> WindowCounts {
        WindowCounts {
            successes: self.successes.swap(0, Ordering::AcqRel),
            failures: self.failures.swap(0, Ordering::AcqRel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureReason;
    use std::sync::Arc;

    #[test]
    fn drain_resets_counts() {
        let agg = OutcomeAggregator::new();
        agg.record(&Outcome::Success);
        agg.record(&Outcome::Success);
        agg.record(&Outcome::Failure(FailureReason::Other));
        assert_eq!(
            agg.drain(),
            WindowCounts {
                successes: 2,
                failures: 1
            }
        );
        assert!(agg.drain().is_empty());
    }

    #[test]
    fn concurrent_drains_lose_nothing() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 20_000;
        let agg = Arc::new(OutcomeAggregator::new());
        let writers: Vec<_> = (0..THREADS)
            .map(|t| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        if (t + i) % 4 == 0 {
                            agg.record_failure();
                        } else {
                            agg.record_success();
                        }
                    }
                })
            })
            .collect();

        let mut seen = WindowCounts::default();
        while writers.iter().any(|w| !w.is_finished()) {
            let w = agg.drain();
            seen.successes += w.successes;
            seen.failures += w.failures;
        }
        for w in writers {
            w.join().unwrap();
        }
        let rest = agg.drain();
        seen.successes += rest.successes;
        seen.failures += rest.failures;

        assert_eq!(seen.total(), THREADS * PER_THREAD);
        assert_eq!(seen.failures, THREADS * PER_THREAD / 4);
    }
}
