//! Combinators over collections of futures.
//!
//! | Combinator | Resolves when | Output |
//! |------------|---------------|--------|
//! | [`all`] | every input succeeded, or the first one failed | `Result<Vec<T>, E>` |
//! | [`all_settled`] | every input settled | `Vec<Settled<T, E>>` |
//! | [`race`] | the first input settled | that input's output |
//! | [`any`] | the first input succeeded, or all failed | `Result<T, AggregateError<E>>` |
//!
//! `all`, `all_settled`, and the errors of `any` are index aligned: position
//! `i` of the output always belongs to input `i`. When several inputs become
//! ready in the same poll, the lowest index is handled first.
//!
//! Inputs of different concrete types can be mixed by boxing them, for
//! example with `futures_lite::FutureExt::boxed_local`. Plain values take part
//! through [`resolve`] and [`reject`].

mod all;
mod all_settled;
mod any;
mod race;
mod ready;

pub use all::{all, All};
pub use all_settled::{all_settled, AllSettled, Settled};
pub use any::{any, AggregateError, Any};
pub use race::{race, Race};
pub use ready::{reject, resolve};
