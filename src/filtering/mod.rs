/*! Filtering utilities

Filters operate on normalized lines (one document or sentence per line).

Filters implement [filter::Filter]: `detect` returns `true` when the line should be kept.
They can be combined with [line::FilterChain].
! */
mod filter;
pub mod line;

pub use filter::Filter;
pub use line::{ExcludeWords, FilterChain, FilterKind, Length, Noisy};
