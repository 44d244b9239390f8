//! Units of work the dispatcher runs.
//!
//! The dispatcher only sees [`WorkFunction`]; concrete functions live in the
//! submodules. Closures can be adapted with [`work_fn`].

mod post;
mod synthetic;

use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use crate::outcome::{FailureReason, Outcome};

pub use post::{FilePost, PostOptions};
pub use synthetic::SyntheticWork;

/// A unit of work invoked once per item. Any returned error counts as a failure.
#[async_trait]
pub trait WorkFunction<I: Send + 'static>: Send + Sync + 'static {
    async fn call(&self, item: I) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`WorkFunction`].
pub struct FnWork<F>(F);

/// Wrap `f` so it can be handed to a [`Dispatcher`](crate::Dispatcher).
pub fn work_fn<I, F, Fut>(f: F) -> FnWork<F>
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    FnWork(f)
}

#[async_trait]
impl<I, F, Fut> WorkFunction<I> for FnWork<F>
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn call(&self, item: I) -> anyhow::Result<()> {
        (self.0)(item).await
    }
}

/// Run `work` on `item` and reduce whatever happens to an [`Outcome`].
/// A panic inside the work function becomes `Failure(Panicked)`.
pub(crate) async fn invoke<I, W>(work: &W, item: I) -> Outcome
where
    I: Send + 'static,
    W: WorkFunction<I> + ?Sized,
{
    match AssertUnwindSafe(work.call(item)).catch_unwind().await {
        Ok(res) => Outcome::from_result(res),
        Err(_) => Outcome::Failure(FailureReason::Panicked),
    }
}
