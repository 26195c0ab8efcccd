//! Fail-fast join over fallible futures.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`all`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct All<F, T> {
    pending: Vec<Option<Pin<Box<F>>>>,
    results: Vec<Option<T>>,
    remaining: usize,
    done: bool,
}

// Inputs are boxed; nothing is structurally pinned.
impl<F, T> Unpin for All<F, T> {}

impl<F, T, E> Future for All<F, T>
where
    F: Future<Output = Result<T, E>>,
{
    type Output = Result<Vec<T>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        assert!(!this.done, "All polled after completion");

        let mut failure = None;
        for (index, slot) in this.pending.iter_mut().enumerate() {
            let Some(future) = slot else {
                continue;
            };
            if let Poll::Ready(output) = future.as_mut().poll(cx) {
                *slot = None;
                match output {
                    Ok(value) => {
                        this.results[index] = Some(value);
                        this.remaining -= 1;
                    }
                    Err(err) => {
                        tracing::trace!(index, "all: input failed, failing fast");
                        failure = Some(err);
                        break;
                    }
                }
            }
        }

        if let Some(err) = failure {
            this.done = true;
            this.pending.clear();
            this.results.clear();
            return Poll::Ready(Err(err));
        }
        if this.remaining == 0 {
            this.done = true;
            this.pending.clear();
            return Poll::Ready(Ok(this.results.drain(..).flatten().collect()));
        }
        Poll::Pending
    }
}

impl<F, T> fmt::Debug for All<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("All")
            .field("len", &self.pending.len())
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// Waits for every input to succeed.
///
/// Resolves to the values in input order, whatever order the inputs finish
/// in. Resolves to the first error as soon as any input fails, dropping the
/// rest. An empty input resolves to an empty vector on the first poll.
///
/// # Example
///
/// ```
/// use pacer::combinator::{all, resolve};
/// use pacer::runtime::EventLoop;
///
/// let lp = EventLoop::virtual_time();
/// let values = lp
///     .block_on(all(vec![resolve::<_, String>(1), resolve(2), resolve(3)]))
///     .unwrap();
/// assert_eq!(values, Ok(vec![1, 2, 3]));
/// ```
pub fn all<I, F, T, E>(futures: I) -> All<F, T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let pending: Vec<_> = futures.into_iter().map(|f| Some(Box::pin(f))).collect();
    let remaining = pending.len();
    All {
        results: std::iter::repeat_with(|| None).take(remaining).collect(),
        pending,
        remaining,
        done: false,
    }
}
