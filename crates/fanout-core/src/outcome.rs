//! Per-item outcomes and coarse failure classification.
//!
//! A work function's error is reduced to a [`FailureReason`] as soon as it
//! returns and the error value itself is dropped, so nothing proportional to
//! the number of failed items is kept alive.

use std::fmt;
use std::io;

/// Result of running one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Collapse a work function's result into an outcome.
    pub fn from_result(res: anyhow::Result<()>) -> Self {
        match res {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::Failure(classify(&e)),
        }
    }
}

/// Coarse reason code retained for a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Local I/O failed (file read, socket write).
    Io,
    /// An operation timed out.
    Timeout,
    /// Connect, resolve, send or receive failure.
    Connection,
    /// Peer answered with an error status.
    Http(u16),
    /// No permit was granted within the admission timeout.
    AdmissionTimeout,
    /// The work function panicked.
    Panicked,
    Other,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Io => write!(f, "io"),
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::Connection => write!(f, "connection"),
            FailureReason::Http(code) => write!(f, "http {}", code),
            FailureReason::AdmissionTimeout => write!(f, "admission timeout"),
            FailureReason::Panicked => write!(f, "panicked"),
            FailureReason::Other => write!(f, "other"),
        }
    }
}

/// Error a work function returns when the peer answered with a failing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("HTTP {0}")]
pub struct HttpStatusError(pub u16);

/// Classify an I/O error kind.
pub fn classify_io_error(e: &io::Error) -> FailureReason {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureReason::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => FailureReason::Connection,
        _ => FailureReason::Io,
    }
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> FailureReason {
    if e.is_operation_timedout() {
        return FailureReason::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return FailureReason::Connection;
    }
    FailureReason::Other
}

/// Classify an arbitrary work error by the first recognised cause in its chain.
pub fn classify(e: &anyhow::Error) -> FailureReason {
    for cause in e.chain() {
        if let Some(status) = cause.downcast_ref::<HttpStatusError>() {
            return FailureReason::Http(status.0);
        }
        if let Some(ce) = cause.downcast_ref::<curl::Error>() {
            return classify_curl_error(ce);
        }
        if let Some(ioe) = cause.downcast_ref::<io::Error>() {
            return classify_io_error(ioe);
        }
        if cause.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
            return FailureReason::Timeout;
        }
    }
    FailureReason::Other
}
