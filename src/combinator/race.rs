//! First-to-settle race.
//!
//! The winner is whichever input is ready first; within one poll, the lowest
//! index wins. Losers are dropped with the race, so work that must outlive
//! the race should be spawned and raced through its
//! [`JoinHandle`](crate::runtime::JoinHandle).
//!
//! # Racing nothing
//!
//! A race over an empty input never settles, matching the identity law
//! `race(∅) = never`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`race`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Race<F> {
    futures: Vec<Pin<Box<F>>>,
}

impl<F: Future> Future for Race<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        for (index, future) in this.futures.iter_mut().enumerate() {
            if let Poll::Ready(output) = future.as_mut().poll(cx) {
                tracing::trace!(winner = index, "race settled");
                this.futures.clear();
                return Poll::Ready(output);
            }
        }
        Poll::Pending
    }
}

impl<F> fmt::Debug for Race<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Race")
            .field("len", &self.futures.len())
            .finish()
    }
}

/// Settles with the output of the first input to complete.
///
/// The output is passed through unchanged, so a `Result` input races both
/// successes and failures. A plain value can take part through
/// [`resolve`](super::resolve) or [`std::future::ready`].
pub fn race<I, F>(futures: I) -> Race<F>
where
    I: IntoIterator<Item = F>,
    F: Future,
{
    Race {
        futures: futures.into_iter().map(Box::pin).collect(),
    }
}
