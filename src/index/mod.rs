//! Reverse index construction
//!
//! The builder accumulates `word -> url -> frequency` in memory for the
//! current session and flushes additive deltas to a [`crate::storage::Storage`].

mod builder;

pub use builder::IndexBuilder;
