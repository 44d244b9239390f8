//! CLI for the fanout dispatcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fanout_core::config;
use std::path::PathBuf;

use commands::{run_bench, run_post, run_serve, BenchArgs, PostArgs, ServeArgs};

/// Top-level CLI for fanout.
#[derive(Debug, Parser)]
#[command(name = "fanout")]
#[command(about = "fanout: bounded-concurrency fan-out with a per-interval throughput report", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// POST a file to a URL many times with bounded concurrency.
    Run {
        /// HTTP/HTTPS endpoint to POST to.
        url: String,
        /// Number of requests to send.
        #[arg(long, short = 'n', default_value = "1000", value_name = "N")]
        count: u64,
        /// Requests in flight at once (default from config).
        #[arg(long, short = 'c', value_name = "L")]
        concurrency: Option<usize>,
        /// File whose contents are sent as the request body.
        #[arg(long, default_value = "file.txt", value_name = "PATH")]
        file: PathBuf,
        /// Report interval in milliseconds (default from config).
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Log every step of every request at debug level.
        #[arg(long)]
        log_steps: bool,
    },

    /// Run an echo server and report requests handled per interval.
    Serve {
        /// Address to listen on (default from config).
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        /// Connections handled at once (default from config).
        #[arg(long, value_name = "N")]
        max_connections: Option<usize>,
        /// Report interval in milliseconds (default from config).
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },

    /// Fan out synthetic work to measure dispatcher throughput.
    Bench {
        /// Number of items.
        #[arg(long, short = 'n', default_value = "100000", value_name = "N")]
        count: u64,
        /// Items in flight at once (default from config).
        #[arg(long, short = 'c', value_name = "L")]
        concurrency: Option<usize>,
        /// Simulated work time per item in milliseconds.
        #[arg(long, default_value = "0", value_name = "MS")]
        delay_ms: u64,
        /// Fail every K-th item.
        #[arg(long, value_name = "K")]
        fail_every: Option<u64>,
        /// Report interval in milliseconds (default from config).
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                url,
                count,
                concurrency,
                file,
                interval_ms,
                log_steps,
            } => {
                let args = PostArgs {
                    url,
                    count,
                    concurrency,
                    file,
                    interval_ms,
                    log_steps,
                };
                run_post(&cfg, args).await?;
            }
            CliCommand::Serve {
                bind,
                max_connections,
                interval_ms,
            } => {
                let args = ServeArgs {
                    bind,
                    max_connections,
                    interval_ms,
                };
                run_serve(&cfg, args).await?;
            }
            CliCommand::Bench {
                count,
                concurrency,
                delay_ms,
                fail_every,
                interval_ms,
            } => {
                let args = BenchArgs {
                    count,
                    concurrency,
                    delay_ms,
                    fail_every,
                    interval_ms,
                };
                run_bench(&cfg, args).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
