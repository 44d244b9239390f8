//! Per-run tallies and the summary returned when a run closes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::outcome::{FailureReason, Outcome};

/// Counters owned by one dispatcher run. Unlike the shared aggregator these
/// are never drained, so the final summary is exact even while a reporter
/// is draining the aggregator.
#[derive(Debug, Default)]
pub(super) struct RunTally {
    successes: AtomicU64,
    failures: AtomicU64,
    admission_timeouts: AtomicU64,
}

impl RunTally {
    pub(super) fn record(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Success => {
                self.successes.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failure(reason) => {
                if *reason == FailureReason::AdmissionTimeout {
                    self.admission_timeouts.fetch_add(1, Ordering::Relaxed);
                }
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(super) fn successes(&self) -> u64 {
        self.successes.load(Ordering::Acquire)
    }

    pub(super) fn failures(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }

    pub(super) fn admission_timeouts(&self) -> u64 {
        self.admission_timeouts.load(Ordering::Acquire)
    }
}

/// Final result of a dispatcher run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub successes: u64,
    pub failures: u64,
    /// Items consumed by the dispatcher (admitted or timed out waiting).
    pub submitted: u64,
    /// Failures caused by the admission timeout (included in `failures`).
    pub admission_timeouts: u64,
    /// True if the run stopped admitting because it was cancelled.
    pub cancelled: bool,
    /// Highest number of items in flight at once.
    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    /// Completed items per second over the whole run (0 if no time elapsed).
    pub fn items_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total() as f64 / secs
    }
}
