//! Minimal HTTP/1.1 request head parsing for the echo server.

use anyhow::{Context, Result};

/// Request line and headers of one HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared body length; 0 when absent.
    pub fn content_length(&self) -> Result<usize> {
        match self.header("content-length") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("bad Content-Length: {}", v)),
            None => Ok(0),
        }
    }
}

/// Parse the text before the blank line that ends an HTTP request head.
pub fn parse_head(head: &str) -> Result<RequestHead> {
    let mut lines = head.split("\r\n").map(str::trim_end);
    let request_line = lines
        .next()
        .filter(|l| !l.is_empty())
        .context("empty request")?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().context("missing method")?.to_string();
    let target = parts.next().context("missing request target")?.to_string();
    let version = parts.next().context("missing HTTP version")?;
    if !version.starts_with("HTTP/1.") {
        anyhow::bail!("unsupported HTTP version: {}", version);
    }

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .with_context(|| format!("malformed header line: {}", line))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    Ok(RequestHead {
        method,
        target,
        headers,
    })
}
