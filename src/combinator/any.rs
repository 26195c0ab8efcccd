//! First-success join over fallible futures.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Every input to [`any`] failed.
///
/// Errors are kept in input order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("all {} inputs failed", .errors.len())]
pub struct AggregateError<E> {
    errors: Vec<E>,
}

impl<E> AggregateError<E> {
    /// Creates an aggregate from per-input errors.
    #[must_use]
    pub const fn new(errors: Vec<E>) -> Self {
        Self { errors }
    }

    /// Returns the errors in input order.
    #[must_use]
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Consumes the aggregate and returns the errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }
}

/// Future returned by [`any`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Any<F, E> {
    pending: Vec<Option<Pin<Box<F>>>>,
    errors: Vec<Option<E>>,
    remaining: usize,
    done: bool,
}

impl<F, E> Unpin for Any<F, E> {}

impl<F, T, E> Future for Any<F, E>
where
    F: Future<Output = Result<T, E>>,
{
    type Output = Result<T, AggregateError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        assert!(!this.done, "Any polled after completion");

        for (index, slot) in this.pending.iter_mut().enumerate() {
            let Some(future) = slot else {
                continue;
            };
            if let Poll::Ready(output) = future.as_mut().poll(cx) {
                *slot = None;
                match output {
                    Ok(value) => {
                        this.pending.clear();
                        this.errors.clear();
                        this.done = true;
                        return Poll::Ready(Ok(value));
                    }
                    Err(err) => {
                        this.errors[index] = Some(err);
                        this.remaining -= 1;
                    }
                }
            }
        }
        if this.remaining == 0 {
            this.done = true;
            this.pending.clear();
            let errors: Vec<E> = this.errors.drain(..).flatten().collect();
            tracing::debug!(failed = errors.len(), "any: every input failed");
            return Poll::Ready(Err(AggregateError::new(errors)));
        }
        Poll::Pending
    }
}

impl<F, E> fmt::Debug for Any<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Any")
            .field("len", &self.errors.len())
            .field("remaining", &self.remaining)
            .field("done", &self.done)
            .finish()
    }
}

/// Resolves to the first input that succeeds.
///
/// If every input fails, resolves to an [`AggregateError`] holding all the
/// errors in input order. An empty input fails on the first poll with an
/// empty aggregate.
pub fn any<I, F, T, E>(futures: I) -> Any<F, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let pending: Vec<_> = futures.into_iter().map(|f| Some(Box::pin(f))).collect();
    let remaining = pending.len();
    Any {
        errors: std::iter::repeat_with(|| None).take(remaining).collect(),
        pending,
        remaining,
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::{reject, resolve};
    use crate::runtime::EventLoop;
    use futures_lite::FutureExt;
    use std::time::Duration;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn first_success_wins_over_earlier_failures() {
        init_test("first_success_wins_over_earlier_failures");
        let lp = EventLoop::virtual_time();
        let handle = lp.handle();
        let slow_ok = async move {
            handle.sleep(Duration::from_millis(40)).await;
            Ok("mirror")
        }
        .boxed_local();
        let out = lp
            .block_on(any(vec![reject("down").boxed_local(), slow_ok]))
            .unwrap();
        crate::assert_with_log!(out == Ok("mirror"), "success wins", Ok::<_, AggregateError<&str>>("mirror"), out);
        crate::test_complete!("first_success_wins_over_earlier_failures");
    }

    #[test]
    fn all_failures_aggregate_in_input_order() {
        init_test("all_failures_aggregate_in_input_order");
        let lp = EventLoop::virtual_time();
        let handle = lp.handle();
        let late = async move {
            handle.sleep(Duration::from_millis(10)).await;
            Err::<u8, _>("late")
        }
        .boxed_local();
        let out = lp
            .block_on(any(vec![late, reject("early").boxed_local()]))
            .unwrap();
        let err = out.unwrap_err();
        assert_eq!(err.errors(), &["late", "early"]);
        assert_eq!(err.to_string(), "all 2 inputs failed");
        crate::test_complete!("all_failures_aggregate_in_input_order");
    }

    #[test]
    fn empty_input_fails_immediately() {
        let lp = EventLoop::virtual_time();
        let out = lp
            .block_on(any(Vec::<std::future::Ready<Result<u8, String>>>::new()))
            .unwrap();
        assert_eq!(out, Err(AggregateError::new(Vec::new())));
    }

    #[test]
    fn ready_success_is_taken() {
        let lp = EventLoop::virtual_time();
        let out = lp
            .block_on(any(vec![reject::<u8, _>("no"), resolve(9)]))
            .unwrap();
        assert_eq!(out, Ok(9));
    }

    #[test]
    #[should_panic(expected = "Any polled after completion")]
    fn polling_after_completion_panics() {
        init_test("polling_after_completion_panics");
        let mut fut = any(vec![resolve::<u8, &str>(1)]);
        let first = futures_lite::future::block_on(futures_lite::future::poll_once(&mut fut));
        crate::assert_with_log!(first == Some(Ok(1)), "first poll settles", "Some(Ok(1))", first);
        let _ = futures_lite::future::block_on(futures_lite::future::poll_once(&mut fut));
    }
}
