//! Core types shared across the toolkit.

pub mod time;

pub use time::Time;
