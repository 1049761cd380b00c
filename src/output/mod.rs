//! Output module for reporting on the persisted index
//!
//! This module handles reading counters and the most frequent words back
//! out of the store for the `--stats` command.

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, IndexStatistics};
