//! Typed errors for admission and submission.
//!
//! Per-item work failures are not errors here: they are classified into
//! [`FailureReason`](crate::outcome::FailureReason) and counted.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No permit became available within the configured admission timeout.
    #[error("admission timed out after {waited:?}")]
    AdmissionTimeout { waited: Duration },
    /// The run was cancelled; no further items are admitted.
    #[error("dispatch cancelled")]
    Cancelled,
    /// The dispatcher no longer accepts submissions.
    #[error("dispatcher is closed")]
    Closed,
}
