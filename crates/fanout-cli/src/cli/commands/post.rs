//! `fanout run <url>` – POST a file many times with bounded concurrency.

use anyhow::{Context, Result};
use fanout_core::config::FanoutConfig;
use fanout_core::reporter::stdout_sink;
use fanout_core::work::{FilePost, PostOptions};
use fanout_core::{Dispatcher, OutcomeAggregator, Reporter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{cancel_on_ctrl_c, with_overrides};

#[derive(Debug)]
pub struct PostArgs {
    pub url: String,
    pub count: u64,
    pub concurrency: Option<usize>,
    pub file: PathBuf,
    pub interval_ms: Option<u64>,
    pub log_steps: bool,
}

pub async fn run_post(cfg: &FanoutConfig, args: PostArgs) -> Result<()> {
    let cfg = with_overrides(cfg, args.concurrency, args.interval_ms);
    let mut post_cfg = cfg.post_or_default();
    post_cfg.log_steps |= args.log_steps;

    tokio::fs::metadata(&args.file)
        .await
        .with_context(|| format!("payload file {}", args.file.display()))?;
    let work = Arc::new(FilePost::new(
        &args.file,
        &args.url,
        PostOptions::from(&post_cfg),
    )?);

    let aggregator = Arc::new(OutcomeAggregator::new());
    let reporter = Reporter::from_config(Arc::clone(&aggregator), stdout_sink(), &cfg)
        .spawn(CancellationToken::new());

    tracing::info!(
        url = %work.url(),
        count = args.count,
        concurrency = cfg.concurrency(),
        "starting POST fan-out"
    );
    let summary = Dispatcher::new(cfg.concurrency(), work)
        .with_aggregator(aggregator)
        .with_cancel(cancel_on_ctrl_c())
        .with_admission_timeout(cfg.admission_timeout())
        .run(0..args.count)
        .await;
    reporter.shutdown().await;

    println!("S:{} F:{}", summary.successes, summary.failures);
    if summary.cancelled {
        println!(
            "Cancelled after {} of {} requests.",
            summary.submitted, args.count
        );
    }
    Ok(())
}
