//! Periodic throughput reporter.
//!
//! One background loop per process: on every tick of a [`DriftSchedule`] it
//! drains the [`OutcomeAggregator`] and writes at most one line to its sink.
//! Shutdown interrupts the sleep and exits without a final report, so counts
//! recorded since the last tick are dropped. The report is best-effort, not
//! exactly-once.

mod line;
mod schedule;
mod sink;

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregator::OutcomeAggregator;
use crate::config::{FanoutConfig, IdlePolicy, TimestampFormat};

pub use line::{format_timestamp, LineFormat, LineRenderer};
pub use schedule::DriftSchedule;
pub use sink::{stdout_sink, MemorySink, ReportSink, WriterSink};

pub struct Reporter<S> {
    aggregator: Arc<OutcomeAggregator>,
    sink: S,
    interval: Duration,
    idle_policy: IdlePolicy,
    line_format: LineFormat,
    timestamp_format: TimestampFormat,
}

impl<S: ReportSink> Reporter<S> {
    pub fn new(aggregator: Arc<OutcomeAggregator>, sink: S, interval: Duration) -> Self {
        Self {
            aggregator,
            sink,
            interval,
            idle_policy: IdlePolicy::default(),
            line_format: LineFormat::default(),
            timestamp_format: TimestampFormat::default(),
        }
    }

    /// Reporter with interval, idle policy and timestamp format taken from `cfg`.
    pub fn from_config(aggregator: Arc<OutcomeAggregator>, sink: S, cfg: &FanoutConfig) -> Self {
        Self::new(aggregator, sink, cfg.report_interval())
            .with_idle_policy(cfg.idle_policy)
            .with_timestamp_format(cfg.timestamp_format)
    }

    pub fn with_idle_policy(mut self, policy: IdlePolicy) -> Self {
        self.idle_policy = policy;
        self
    }

    pub fn with_line_format(mut self, format: LineFormat) -> Self {
        self.line_format = format;
        self
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Start the loop on the runtime. It runs until `cancel` fires or the
    /// returned handle is shut down.
    pub fn spawn(self, cancel: CancellationToken) -> ReporterHandle {
        let join = tokio::spawn(self.run(cancel.clone()));
        ReporterHandle { cancel, join }
    }

    /// Run the loop on the current task. Returns the number of ticks processed.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let mut schedule = DriftSchedule::new(Instant::now(), self.interval);
        let mut renderer =
            LineRenderer::new(self.line_format, self.idle_policy, self.timestamp_format);
        tracing::debug!(
            interval_ms = schedule.interval().as_millis() as u64,
            "reporter started"
        );

        loop {
            let wake = schedule.advance();
            if schedule.remaining(Instant::now()).is_zero() {
                tracing::debug!(tick = schedule.ticks(), "reporter behind schedule, firing immediately");
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(wake) => {}
            }

            let counts = self.aggregator.drain();
            if let Some(line) = renderer.on_tick(counts, Local::now()) {
                if let Err(e) = self.sink.write_line(&line).await {
                    tracing::warn!("report sink write failed: {}", e);
                }
            }
        }

        // The last wake handed out was never reached.
        let ticks = schedule.ticks().saturating_sub(1);
        tracing::debug!(ticks, "reporter stopped");
        ticks
    }
}

/// Handle to a spawned reporter.
pub struct ReporterHandle {
    cancel: CancellationToken,
    join: JoinHandle<u64>,
}

impl ReporterHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the loop and wait for it to exit. Returns the number of ticks run.
    pub async fn shutdown(self) -> u64 {
        self.cancel.cancel();
        match self.join.await {
            Ok(ticks) => ticks,
            Err(e) => {
                tracing::warn!("reporter task join: {}", e);
                0
            }
        }
    }
}
