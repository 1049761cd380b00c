//! Word tokenizer
//!
//! Splits extracted text into runs of ASCII letters. Input is expected to be
//! lowercased by the extractor already; tokens are lowercased again so the
//! tokenizer can be used on raw text as well.

use std::collections::HashMap;

/// Splits text into lowercase letter runs, in order of appearance
///
/// # Example
///
/// ```
/// use ripple_index::crawler::tokenize;
///
/// assert_eq!(
///     tokenize("Hello World! foo-bar BAZ"),
///     vec!["hello", "world", "foo", "bar", "baz"]
/// );
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|run| !run.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Counts occurrences of each token
pub fn count_tokens<S: AsRef<str>>(tokens: &[S]) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_ref().to_string()).or_insert(0) += 1;
    }
    counts
}
