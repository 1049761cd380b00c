//! State module for tracking crawl progress
//!
//! - `UrlState`: where a URL is in the frontier (pending, in flight, done)
//! - `Outcome` / `FailureKind`: how processing of a URL ended

mod url_state;

pub use url_state::{FailureKind, Outcome, UrlState};
