//! URL handling module for Ripple-Index
//!
//! This module provides canonical URL normalization (the frontier's dedup key)
//! and the link filter that turns raw hrefs into crawl targets.

mod filter;
mod normalize;

pub use filter::{LinkFilter, LinkRejection};
pub use normalize::{canonical_string, canonicalize, normalize_url};
