//! Bounded fan-out of work items with a join-all barrier.
//!
//! Items are admitted one at a time through the [`AdmissionGate`]: the
//! submitter waits for a permit before the task is spawned, so at most
//! `limit` tasks exist at once and a producer faster than the work is
//! slowed down rather than buffered. Every spawned task is tracked in a
//! `JoinSet`; [`Dispatcher::close`] returns only after all of them finish.
//!
//! Cancellation stops admissions. Tasks already admitted run to completion
//! and are counted.

mod summary;
mod task;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregator::OutcomeAggregator;
use crate::error::DispatchError;
use crate::gate::{AdmissionGate, Permit};
use crate::outcome::{FailureReason, Outcome};
use crate::work::WorkFunction;

pub use summary::RunSummary;
use summary::RunTally;

/// Lifecycle of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Accepting submissions.
    Open,
    /// No new submissions; waiting on in-flight tasks.
    Draining,
    /// All tasks joined.
    Closed,
}

/// Fans items of type `I` out to `W`, at most `limit` at a time.
pub struct Dispatcher<I, W: ?Sized> {
    gate: AdmissionGate,
    work: Arc<W>,
    aggregator: Arc<OutcomeAggregator>,
    tally: Arc<RunTally>,
    cancel: CancellationToken,
    admission_timeout: Option<Duration>,
    tasks: JoinSet<()>,
    state: DispatchState,
    submitted: u64,
    started: Instant,
    _item: PhantomData<fn(I)>,
}

impl<I, W> Dispatcher<I, W>
where
    I: Send + 'static,
    W: WorkFunction<I> + ?Sized,
{
    /// Create a dispatcher with its own aggregator and cancellation token.
    pub fn new(limit: usize, work: Arc<W>) -> Self {
        Self {
            gate: AdmissionGate::new(limit),
            work,
            aggregator: Arc::new(OutcomeAggregator::new()),
            tally: Arc::new(RunTally::default()),
            cancel: CancellationToken::new(),
            admission_timeout: None,
            tasks: JoinSet::new(),
            state: DispatchState::Open,
            submitted: 0,
            started: Instant::now(),
            _item: PhantomData,
        }
    }

    /// Record outcomes into a shared aggregator (e.g. one a reporter drains).
    pub fn with_aggregator(mut self, aggregator: Arc<OutcomeAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Stop admitting when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Give up on an item if no permit frees up within `timeout`.
    pub fn with_admission_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.admission_timeout = timeout;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn aggregator(&self) -> &Arc<OutcomeAggregator> {
        &self.aggregator
    }

    /// Token that cancels this dispatcher's run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Items consumed so far.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Admit one item, waiting for a permit if the gate is full.
    ///
    /// Returns `Cancelled` (item not consumed) if the run is cancelled before
    /// a permit is granted, and `Closed` after [`close`](Self::close). On
    /// `AdmissionTimeout` the item is consumed and counted as a failure.
    pub async fn submit(&mut self, item: I) -> Result<(), DispatchError> {
        if self.state != DispatchState::Open {
            return Err(DispatchError::Closed);
        }
        if self.cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let admitted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(DispatchError::Cancelled),
            res = self.admit() => res,
        };

        self.submitted += 1;
        let permit = match admitted {
            Ok(permit) => permit,
            Err(DispatchError::AdmissionTimeout { waited }) => {
                let outcome = Outcome::Failure(FailureReason::AdmissionTimeout);
                self.aggregator.record(&outcome);
                self.tally.record(&outcome);
                tracing::warn!(waited_ms = waited.as_millis() as u64, "admission timed out");
                return Err(DispatchError::AdmissionTimeout { waited });
            }
            Err(e) => return Err(e),
        };

        self.tasks.spawn(task::execute(
            item,
            Arc::clone(&self.work),
            permit,
            Arc::clone(&self.aggregator),
            Arc::clone(&self.tally),
        ));
        self.reap_finished();
        Ok(())
    }

    /// Stop accepting items and wait for every admitted task to finish.
    pub async fn close(&mut self) -> RunSummary {
        if self.state == DispatchState::Open {
            self.state = DispatchState::Draining;
            tracing::debug!(in_flight = self.tasks.len(), "dispatcher draining");
        }
        while let Some(res) = self.tasks.join_next().await {
            log_join_error(res);
        }
        self.state = DispatchState::Closed;

        let summary = self.summary();
        tracing::info!(
            successes = summary.successes,
            failures = summary.failures,
            submitted = summary.submitted,
            cancelled = summary.cancelled,
            peak_in_flight = summary.peak_in_flight,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "dispatcher closed"
        );
        summary
    }

    /// Submit every item (until cancelled), then close.
    pub async fn run<It>(mut self, items: It) -> RunSummary
    where
        It: IntoIterator<Item = I>,
    {
        tracing::info!(limit = self.gate.limit(), "dispatch run started");
        for item in items {
            match self.submit(item).await {
                Ok(()) | Err(DispatchError::AdmissionTimeout { .. }) => {}
                Err(DispatchError::Cancelled) | Err(DispatchError::Closed) => break,
            }
        }
        self.close().await
    }

    async fn admit(&self) -> Result<Permit, DispatchError> {
        match self.admission_timeout {
            Some(timeout) => self.gate.acquire_timeout(timeout).await,
            None => self.gate.acquire().await,
        }
    }

    /// Drop join handles of tasks that already finished so a long stream
    /// does not accumulate them.
    fn reap_finished(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            log_join_error(res);
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            successes: self.tally.successes(),
            failures: self.tally.failures(),
            submitted: self.submitted,
            admission_timeouts: self.tally.admission_timeouts(),
            cancelled: self.cancel.is_cancelled(),
            peak_in_flight: self.gate.peak(),
            elapsed: self.started.elapsed(),
        }
    }
}

fn log_join_error(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        tracing::warn!("dispatch task join: {}", e);
    }
}
