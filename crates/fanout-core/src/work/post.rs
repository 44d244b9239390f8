//! File POST work: read a file and send its bytes to an HTTP endpoint.
//!
//! Uses the curl crate (libcurl) on the blocking pool; the file is read with
//! tokio's fs so only the transfer occupies a blocking thread.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::PostConfig;
use crate::outcome::HttpStatusError;

use super::WorkFunction;

/// Transfer settings for [`FilePost`].
#[derive(Debug, Clone)]
pub struct PostOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Log every step (read, send, status, body) at debug level.
    pub log_steps: bool,
    /// Treat a response status >= 400 as a failure.
    pub fail_on_http_error: bool,
}

impl Default for PostOptions {
    fn default() -> Self {
        PostOptions::from(&PostConfig::default())
    }
}

impl From<&PostConfig> for PostOptions {
    fn from(cfg: &PostConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            log_steps: cfg.log_steps,
            fail_on_http_error: cfg.fail_on_http_error,
        }
    }
}

/// POSTs the contents of `path` to `url` once per item. The item itself is ignored.
#[derive(Debug, Clone)]
pub struct FilePost {
    path: PathBuf,
    url: String,
    options: PostOptions,
}

impl FilePost {
    /// Validates `url` up front so a typo fails the command, not every item.
    pub fn new(path: impl Into<PathBuf>, url: &str, options: PostOptions) -> Result<Self> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!("unsupported URL scheme: {}", other),
        }
        Ok(Self {
            path: path.into(),
            url: parsed.into(),
            options,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl<I: Send + 'static> WorkFunction<I> for FilePost {
    async fn call(&self, _item: I) -> Result<()> {
        let log = self.options.log_steps;
        if log {
            tracing::debug!(path = %self.path.display(), "reading file");
        }
        let data = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to open file: {}", self.path.display()))?;
        if log {
            tracing::debug!(bytes = data.len(), "read file");
            tracing::debug!(url = %self.url, "sending HTTP request");
        }

        let url = self.url.clone();
        let opts = self.options.clone();
        let (status, body) = tokio::task::spawn_blocking(move || post_bytes(&url, &data, &opts))
            .await
            .context("post task join")??;

        if log {
            tracing::debug!(status, "received response");
            tracing::debug!(body = %String::from_utf8_lossy(&body), "response body");
        }
        if self.options.fail_on_http_error && status >= 400 {
            return Err(HttpStatusError(status as u16)).with_context(|| format!("POST {}", self.url));
        }
        Ok(())
    }
}

/// Blocking POST of `data` to `url`; returns the status code and response body.
fn post_bytes(url: &str, data: &[u8], opts: &PostOptions) -> Result<(u32, Vec<u8>)> {
    let mut body = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.post(true)?;
    easy.post_fields_copy(data)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.timeout)?;

    let mut list = curl::easy::List::new();
    list.append("Content-Type: text/plain")?;
    // Send the body straight away instead of waiting on 100-continue.
    list.append("Expect:")?;
    easy.http_headers(list)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|chunk| {
            body.extend_from_slice(chunk);
            Ok(chunk.len())
        })?;
        transfer
            .perform()
            .with_context(|| format!("failed to send HTTP request to {}", url))?;
    }

    let code = easy.response_code().context("no response code")?;
    Ok((code, body))
}
