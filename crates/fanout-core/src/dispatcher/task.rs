//! Body of one admitted task: run the work, record the outcome, release.

use std::sync::Arc;

use crate::aggregator::OutcomeAggregator;
use crate::gate::Permit;
use crate::outcome::Outcome;
use crate::work::{self, WorkFunction};

use super::summary::RunTally;

/// Runs `item` while holding `permit`. The outcome is recorded before the
/// permit is dropped, so a task admitted into the freed slot always sees
/// this item already counted.
pub(super) async fn execute<I, W>(
    item: I,
    work: Arc<W>,
    permit: Permit,
    aggregator: Arc<OutcomeAggregator>,
    tally: Arc<RunTally>,
) where
    I: Send + 'static,
    W: WorkFunction<I> + ?Sized,
{
    let outcome = work::invoke(work.as_ref(), item).await;
    if let Outcome::Failure(reason) = outcome {
        tracing::trace!(%reason, "work item failed");
    }
    aggregator.record(&outcome);
    tally.record(&outcome);
    permit.release();
}
