//! `fanout bench` – synthetic fan-out to measure dispatcher overhead.

use anyhow::Result;
use fanout_core::config::FanoutConfig;
use fanout_core::reporter::stdout_sink;
use fanout_core::work::SyntheticWork;
use fanout_core::{Dispatcher, OutcomeAggregator, Reporter, RunSummary};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{cancel_on_ctrl_c, with_overrides};

#[derive(Debug)]
pub struct BenchArgs {
    pub count: u64,
    pub concurrency: Option<usize>,
    pub delay_ms: u64,
    pub fail_every: Option<u64>,
    pub interval_ms: Option<u64>,
}

fn print_summary(summary: &RunSummary, limit: usize) {
    println!(
        "  {:>10}  {:>10}  {:>10}  {:>8}  {:>8}  {:>12}",
        "Successes", "Failures", "Limit", "Peak", "Time(s)", "Items/s"
    );
    println!(
        "  {}  {}  {}  {}  {}  {}",
        "----------", "----------", "----------", "--------", "--------", "------------"
    );
    println!(
        "  {:>10}  {:>10}  {:>10}  {:>8}  {:>8.2}  {:>12.0}",
        summary.successes,
        summary.failures,
        limit,
        summary.peak_in_flight,
        summary.elapsed.as_secs_f64(),
        summary.items_per_sec()
    );
}

pub async fn run_bench(cfg: &FanoutConfig, args: BenchArgs) -> Result<()> {
    let cfg = with_overrides(cfg, args.concurrency, args.interval_ms);
    let work = Arc::new(SyntheticWork::new(
        Duration::from_millis(args.delay_ms),
        args.fail_every,
    ));

    let aggregator = Arc::new(OutcomeAggregator::new());
    let reporter = Reporter::from_config(Arc::clone(&aggregator), stdout_sink(), &cfg)
        .spawn(CancellationToken::new());

    let summary = Dispatcher::new(cfg.concurrency(), work)
        .with_aggregator(aggregator)
        .with_cancel(cancel_on_ctrl_c())
        .with_admission_timeout(cfg.admission_timeout())
        .run(1..=args.count)
        .await;
    reporter.shutdown().await;

    print_summary(&summary, cfg.concurrency());
    Ok(())
}
