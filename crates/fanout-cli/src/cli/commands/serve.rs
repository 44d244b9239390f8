//! `fanout serve` – echo server with a requests-per-interval report.

use anyhow::Result;
use fanout_core::config::FanoutConfig;
use fanout_core::echo::{EchoHandler, EchoServer};
use fanout_core::reporter::{stdout_sink, LineFormat};
use fanout_core::Reporter;
use tokio_util::sync::CancellationToken;

use super::{cancel_on_ctrl_c, with_overrides};

#[derive(Debug)]
pub struct ServeArgs {
    pub bind: Option<String>,
    pub max_connections: Option<usize>,
    pub interval_ms: Option<u64>,
}

pub async fn run_serve(cfg: &FanoutConfig, args: ServeArgs) -> Result<()> {
    let cfg = with_overrides(cfg, None, args.interval_ms);
    let serve_cfg = cfg.serve_or_default();
    let bind = args.bind.unwrap_or_else(|| serve_cfg.bind.clone());
    let max_connections = args.max_connections.unwrap_or(serve_cfg.max_connections);

    let server = EchoServer::bind(&bind, max_connections)
        .await?
        .with_handler(EchoHandler::new(serve_cfg.io_timeout()));
    println!("Listening on {}", server.local_addr()?);

    let reporter = Reporter::from_config(server.aggregator(), stdout_sink(), &cfg)
        .with_line_format(LineFormat::Single)
        .spawn(CancellationToken::new());

    let summary = server.serve(cancel_on_ctrl_c()).await?;
    reporter.shutdown().await;

    println!(
        "Stopped after {} request(s), {} failed.",
        summary.successes, summary.failures
    );
    Ok(())
}
