//! Already-settled inputs, for mixing plain values into the combinators.

use std::future::{ready, Ready};

/// An input that has already succeeded with `value`.
pub fn resolve<T, E>(value: T) -> Ready<Result<T, E>> {
    ready(Ok(value))
}

/// An input that has already failed with `reason`.
pub fn reject<T, E>(reason: E) -> Ready<Result<T, E>> {
    ready(Err(reason))
}
