use std::{fmt::Display, future::Future, ops::Add, time::Duration};

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, warn};


/// Runs every future concurrently and returns once all of them have settled.
///
/// Outputs are in the order the futures were given, whatever order they finished in.
pub(crate) async fn settle_all<I>(futures: I) -> Vec<<I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future
{
    join_all(futures).await
}


/// Like [`settle_all`], but at most `batch_size` futures run at a time, with `delay`
/// waited before each batch is dispatched.
///
/// Futures are lazy, so a future is only started once its batch is.
pub(crate) async fn settle_in_batches<I>(futures: I, batch_size: usize, delay: Duration) -> Vec<<I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future
{
    let mut futures = futures.into_iter();
    let mut settled = Vec::new();
    let mut batch_index = 0usize;

    loop {
        let batch: Vec<_> = futures.by_ref().take(batch_size.max(1)).collect();
        if batch.is_empty() {
            break;
        }
        if !delay.is_zero() {
            sleep(delay).await;
        }
        debug!(batch = batch_index, size = batch.len(), "Dispatching batch");
        settled.extend(join_all(batch).await);
        batch_index += 1;
    }

    settled
}


/// Runs the futures one after another, waiting `delay` before each. Outputs keep
/// the order the futures were given in.
pub(crate) async fn settle_in_turn<I>(futures: I, delay: Duration) -> Vec<<I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future
{
    let mut settled = Vec::new();
    for future in futures {
        if !delay.is_zero() {
            sleep(delay).await;
        }
        settled.push(future.await);
    }
    settled
}


/// How many members of a settled batch succeeded and failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub(crate) succeeded: usize,
    pub(crate) failed: usize
}


impl Tally {
    /// Counts the outcomes, logging every failure.
    pub(crate) fn of<T, E: Display>(outcomes: &[Result<T, E>]) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            tally.record(outcome);
        }
        tally
    }

    pub(crate) fn record<T, E: Display>(&mut self, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(error) => {
                warn!(%error, "Fetch failed");
                self.failed += 1;
            }
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}


impl Add for Tally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            succeeded: self.succeeded + rhs.succeeded,
            failed: self.failed + rhs.failed
        }
    }
}
