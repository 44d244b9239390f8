//! Turning drained counts into report lines.

use chrono::{DateTime, Local, SecondsFormat};

use crate::aggregator::WindowCounts;
use crate::config::{IdlePolicy, TimestampFormat};

/// Shape of an active report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// `<timestamp> <successes> <failures>`
    #[default]
    Pair,
    /// `<timestamp> <successes>`; failures are not shown and do not make a tick active.
    Single,
}

/// Decides what, if anything, each tick prints.
#[derive(Debug, Clone)]
pub struct LineRenderer {
    format: LineFormat,
    idle: IdlePolicy,
    timestamps: TimestampFormat,
    was_active: bool,
}

impl LineRenderer {
    pub fn new(format: LineFormat, idle: IdlePolicy, timestamps: TimestampFormat) -> Self {
        Self {
            format,
            idle,
            timestamps,
            was_active: false,
        }
    }

    fn is_active(&self, counts: &WindowCounts) -> bool {
        match self.format {
            LineFormat::Pair => !counts.is_empty(),
            LineFormat::Single => counts.successes > 0,
        }
    }

    /// Line for this tick. `Some("")` is the blank separator closing a burst.
    pub fn on_tick(&mut self, counts: WindowCounts, now: DateTime<Local>) -> Option<String> {
        if self.is_active(&counts) || self.idle == IdlePolicy::EveryTick {
            self.was_active = self.is_active(&counts);
            return Some(self.format_line(counts, now));
        }
        if self.was_active {
            self.was_active = false;
            return Some(String::new());
        }
        None
    }

    fn format_line(&self, counts: WindowCounts, now: DateTime<Local>) -> String {
        let ts = format_timestamp(now, self.timestamps);
        match self.format {
            LineFormat::Pair => format!("{} {} {}", ts, counts.successes, counts.failures),
            LineFormat::Single => format!("{} {}", ts, counts.successes),
        }
    }
}

pub fn format_timestamp(now: DateTime<Local>, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::Rfc3339 => now.to_rfc3339_opts(SecondsFormat::Millis, false),
        TimestampFormat::EpochMillis => now.timestamp_millis().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    fn counts(successes: u64, failures: u64) -> WindowCounts {
        WindowCounts {
            successes,
            failures,
        }
    }

    #[test]
    fn burst_then_single_separator() {
        let mut r = LineRenderer::new(
            LineFormat::Pair,
            IdlePolicy::Separator,
            TimestampFormat::EpochMillis,
        );
        assert_eq!(r.on_tick(counts(0, 0), at()), None);
        assert_eq!(
            r.on_tick(counts(5, 0), at()).as_deref(),
            Some("1700000000123 5 0")
        );
        assert_eq!(
            r.on_tick(counts(0, 2), at()).as_deref(),
            Some("1700000000123 0 2")
        );
        assert_eq!(r.on_tick(counts(0, 0), at()).as_deref(), Some(""));
        assert_eq!(r.on_tick(counts(0, 0), at()), None);
        assert_eq!(r.on_tick(counts(0, 0), at()), None);
    }

    #[test]
    fn every_tick_prints_zeros() {
        let mut r = LineRenderer::new(
            LineFormat::Pair,
            IdlePolicy::EveryTick,
            TimestampFormat::EpochMillis,
        );
        assert_eq!(
            r.on_tick(counts(0, 0), at()).as_deref(),
            Some("1700000000123 0 0")
        );
        assert_eq!(
            r.on_tick(counts(3, 1), at()).as_deref(),
            Some("1700000000123 3 1")
        );
        assert_eq!(
            r.on_tick(counts(0, 0), at()).as_deref(),
            Some("1700000000123 0 0")
        );
    }

    #[test]
    fn single_form_ignores_failures() {
        let mut r = LineRenderer::new(
            LineFormat::Single,
            IdlePolicy::Separator,
            TimestampFormat::EpochMillis,
        );
        assert_eq!(
            r.on_tick(counts(7, 3), at()).as_deref(),
            Some("1700000000123 7")
        );
        assert_eq!(r.on_tick(counts(0, 4), at()).as_deref(), Some(""));
        assert_eq!(r.on_tick(counts(0, 4), at()), None);
    }

    #[test]
    fn rfc3339_has_millis_and_offset() {
        let ts = format_timestamp(at(), TimestampFormat::Rfc3339);
        let parsed = DateTime::parse_from_rfc3339(&ts).unwrap();
        assert_eq!(parsed.timestamp_millis(), 1_700_000_000_123);
        assert!(ts.contains(".123"));
    }
}
