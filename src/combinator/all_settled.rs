//! Join that waits for every input and never fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The outcome of one input to [`all_settled`].
///
/// Serializes as `{"status":"fulfilled","value":...}` or
/// `{"status":"rejected","reason":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Settled<T, E> {
    /// The input succeeded.
    Fulfilled {
        /// The success value.
        value: T,
    },
    /// The input failed.
    Rejected {
        /// The error.
        reason: E,
    },
}

impl<T, E> Settled<T, E> {
    /// Returns true if the input succeeded.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }

    /// Returns true if the input failed.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns the success value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Fulfilled { value } => Some(value),
            Self::Rejected { .. } => None,
        }
    }

    /// Returns the error, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<&E> {
        match self {
            Self::Fulfilled { .. } => None,
            Self::Rejected { reason } => Some(reason),
        }
    }

    /// Converts back into a `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Fulfilled { value } => Ok(value),
            Self::Rejected { reason } => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled { value },
            Err(reason) => Self::Rejected { reason },
        }
    }
}

/// Future returned by [`all_settled`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct AllSettled<F, T, E> {
    pending: Vec<Option<Pin<Box<F>>>>,
    results: Vec<Option<Settled<T, E>>>,
    remaining: usize,
}

impl<F, T, E> Unpin for AllSettled<F, T, E> {}

impl<F, T, E> Future for AllSettled<F, T, E>
where
    F: Future<Output = Result<T, E>>,
{
    type Output = Vec<Settled<T, E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        for (index, slot) in this.pending.iter_mut().enumerate() {
            let Some(future) = slot else {
                continue;
            };
            if let Poll::Ready(output) = future.as_mut().poll(cx) {
                *slot = None;
                this.results[index] = Some(output.into());
                this.remaining -= 1;
            }
        }
        if this.remaining == 0 {
            this.pending.clear();
            return Poll::Ready(this.results.drain(..).flatten().collect());
        }
        Poll::Pending
    }
}

impl<F, T, E> fmt::Debug for AllSettled<F, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllSettled")
            .field("len", &self.results.len())
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// Waits for every input to settle and reports each outcome in input order.
///
/// Never fails. An empty input resolves to an empty vector on the first
/// poll.
pub fn all_settled<I, F, T, E>(futures: I) -> AllSettled<F, T, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let pending: Vec<_> = futures.into_iter().map(|f| Some(Box::pin(f))).collect();
    let remaining = pending.len();
    AllSettled {
        results: std::iter::repeat_with(|| None).take(remaining).collect(),
        pending,
        remaining,
    }
}
