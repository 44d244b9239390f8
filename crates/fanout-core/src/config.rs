use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the reporter prints on a tick with nothing to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// One blank line after a burst, then silence.
    #[default]
    Separator,
    /// A zero-count line on every tick.
    EveryTick,
}

/// Timestamp rendering for report lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Local time, RFC 3339 with milliseconds.
    #[default]
    Rfc3339,
    /// Milliseconds since the Unix epoch.
    EpochMillis,
}

/// File POST settings (optional `[post]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    /// Log each step of every POST at debug level (noisy at high fan-out).
    #[serde(default)]
    pub log_steps: bool,
    /// Count responses with status >= 400 as failures.
    #[serde(default)]
    pub fail_on_http_error: bool,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 10,
            log_steps: false,
            fail_on_http_error: false,
        }
    }
}

/// Echo server settings (optional `[serve]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    pub bind: String,
    /// Connections handled at once; further accepts wait for a free slot.
    pub max_connections: usize,
    /// Time allowed to read a request and write the reply.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

fn default_io_timeout_secs() -> u64 {
    10
}

impl ServeConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_connections: 10_000,
            io_timeout_secs: default_io_timeout_secs(),
        }
    }
}

/// Global configuration loaded from `~/.config/fanout/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Maximum number of work items in flight at once.
    pub concurrency: usize,
    /// Reporter tick interval in milliseconds.
    pub report_interval_ms: u64,
    #[serde(default)]
    pub idle_policy: IdlePolicy,
    #[serde(default)]
    pub timestamp_format: TimestampFormat,
    /// Give up waiting for a permit after this long (None = wait forever).
    #[serde(default)]
    pub admission_timeout_ms: Option<u64>,
    #[serde(default)]
    pub post: Option<PostConfig>,
    #[serde(default)]
    pub serve: Option<ServeConfig>,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            concurrency: 200,
            report_interval_ms: 1000,
            idle_policy: IdlePolicy::default(),
            timestamp_format: TimestampFormat::default(),
            admission_timeout_ms: None,
            post: None,
            serve: None,
        }
    }
}

impl FanoutConfig {
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Reporter interval; a zero value is raised to 1ms.
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms.max(1))
    }

    pub fn admission_timeout(&self) -> Option<Duration> {
        self.admission_timeout_ms.map(Duration::from_millis)
    }

    pub fn post_or_default(&self) -> PostConfig {
        self.post.clone().unwrap_or_default()
    }

    pub fn serve_or_default(&self) -> ServeConfig {
        self.serve.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fanout")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FanoutConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FanoutConfig::default();
        write_to_path(&default_cfg, &path)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<FanoutConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: FanoutConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

pub fn write_to_path(cfg: &FanoutConfig, path: &Path) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("write config {}", path.display()))?;
    Ok(())
}
