//! CLI command handlers. Each command is in its own file.

mod bench;
mod post;
mod serve;

use fanout_core::config::FanoutConfig;
use tokio_util::sync::CancellationToken;

pub use bench::{run_bench, BenchArgs};
pub use post::{run_post, PostArgs};
pub use serve::{run_serve, ServeArgs};

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, draining in-flight work");
            trigger.cancel();
        }
    });
    token
}

/// Copy of `cfg` with command-line overrides applied.
fn with_overrides(
    cfg: &FanoutConfig,
    concurrency: Option<usize>,
    interval_ms: Option<u64>,
) -> FanoutConfig {
    let mut cfg = cfg.clone();
    if let Some(c) = concurrency {
        cfg.concurrency = c;
    }
    if let Some(ms) = interval_ms {
        cfg.report_interval_ms = ms;
    }
    cfg
}
