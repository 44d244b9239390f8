//! Echo server: an inbound work producer for the dispatcher.
//!
//! Accepted connections are submitted to a streaming [`Dispatcher`] whose
//! work function answers the request; the shared aggregator counts handled
//! requests so a [`Reporter`](crate::Reporter) can print requests per tick.

mod handler;
mod request;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::aggregator::OutcomeAggregator;
use crate::dispatcher::{Dispatcher, RunSummary};
use crate::error::DispatchError;

pub use handler::{render_echo, Connection, EchoHandler};
pub use request::{parse_head, RequestHead};

pub struct EchoServer {
    listener: TcpListener,
    max_connections: usize,
    aggregator: Arc<OutcomeAggregator>,
    handler: EchoHandler,
}

impl EchoServer {
    pub async fn bind(addr: &str, max_connections: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind {}", addr))?;
        Ok(Self {
            listener,
            max_connections: max_connections.max(1),
            aggregator: Arc::new(OutcomeAggregator::new()),
            handler: EchoHandler::default(),
        })
    }

    pub fn with_handler(mut self, handler: EchoHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Aggregator that counts handled requests; hand it to a reporter.
    pub fn aggregator(&self) -> Arc<OutcomeAggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Accept connections until `cancel` fires, then wait for in-flight
    /// requests to finish.
    pub async fn serve(self, cancel: CancellationToken) -> Result<RunSummary> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, max_connections = self.max_connections, "echo server started");
        let mut dispatcher = Dispatcher::new(self.max_connections, Arc::new(self.handler))
            .with_aggregator(Arc::clone(&self.aggregator))
            .with_cancel(cancel.clone());

        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.listener.accept() => res,
            };
            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                    continue;
                }
            };
            match dispatcher.submit(Connection { stream, peer }).await {
                Ok(()) | Err(DispatchError::AdmissionTimeout { .. }) => {}
                Err(DispatchError::Cancelled) | Err(DispatchError::Closed) => break,
            }
        }

        let summary = dispatcher.close().await;
        tracing::info!(%addr, handled = summary.successes, failed = summary.failures, "echo server stopped");
        Ok(summary)
    }
}
