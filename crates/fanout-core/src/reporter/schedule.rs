//! Drift-corrected periodic schedule.
//!
//! Each wake time is the previous *scheduled* wake plus the interval, never
//! "now + interval", so time spent in a tick or lost to scheduler jitter
//! does not push later ticks back.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct DriftSchedule {
    interval: Duration,
    next_wake: Instant,
    ticks: u64,
}

impl DriftSchedule {
    /// Schedule whose first wake is `origin + interval`. A zero interval is raised to 1ms.
    pub fn new(origin: Instant, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            interval,
            next_wake: origin,
            ticks: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of wake times handed out so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Move to the next wake time and return it.
    pub fn advance(&mut self) -> Instant {
        self.next_wake += self.interval;
        self.ticks += 1;
        self.next_wake
    }

    /// Time left until the current wake, zero if it already passed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_wake.saturating_duration_since(now)
    }
}
