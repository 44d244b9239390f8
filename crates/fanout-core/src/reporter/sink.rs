//! Destinations for report lines.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A line-oriented output. Implementations add the newline.
#[async_trait]
pub trait ReportSink: Send + 'static {
    async fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Writes each line to an async writer and flushes it.
#[derive(Debug)]
pub struct WriterSink<W>(W);

impl<W: AsyncWrite + Unpin + Send + 'static> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self(writer)
    }
}

/// Sink for the process's stdout. Writes go through tokio's blocking pool.
pub fn stdout_sink() -> WriterSink<tokio::io::Stdout> {
    WriterSink::new(tokio::io::stdout())
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> ReportSink for WriterSink<W> {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.0.write_all(&buf).await?;
        self.0.flush().await
    }
}

/// Keeps lines in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writer_sink_appends_newlines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_line("a 1 0").await.unwrap();
        sink.write_line("").await.unwrap();
        assert_eq!(sink.0, b"a 1 0\n\n");
    }

    #[tokio::test]
    async fn memory_sink_clones_share_lines() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_line("x").await.unwrap();
        assert_eq!(sink.lines(), vec!["x".to_string()]);
    }
}
