//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! index statistics from the storage layer.

use crate::storage::{SessionRecord, Storage};
use crate::RippleError;
use std::fmt::Write;

/// Index statistics summary
#[derive(Debug, Clone)]
pub struct IndexStatistics {
    /// Pages with a stored record
    pub total_pages: u64,

    /// Distinct words in the dictionary
    pub total_words: u64,

    /// (word, url) rows in the reverse index
    pub total_index_entries: u64,

    /// URLs in the visited set
    pub total_visited: u64,

    pub total_sessions: u64,

    pub latest_session: Option<SessionRecord>,

    /// Most frequent words summed across URLs
    pub top_words: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `top_n` - How many of the most frequent words to include
pub fn load_statistics(storage: &dyn Storage, top_n: usize) -> Result<IndexStatistics, RippleError> {
    Ok(IndexStatistics {
        total_pages: storage.count_pages()?,
        total_words: storage.count_words()?,
        total_index_entries: storage.count_index_entries()?,
        total_visited: storage.count_visited()?,
        total_sessions: storage.count_sessions()?,
        latest_session: storage.latest_session()?,
        top_words: storage.top_words(top_n)?,
    })
}

/// Renders statistics as plain text
pub fn format_statistics(stats: &IndexStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Index Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Pages indexed: {}", stats.total_pages);
    let _ = writeln!(out, "  Distinct words: {}", stats.total_words);
    let _ = writeln!(out, "  Index entries: {}", stats.total_index_entries);
    let _ = writeln!(out, "  URLs visited: {}", stats.total_visited);
    let _ = writeln!(out, "  Sessions: {}", stats.total_sessions);

    if stats.total_pages > 0 {
        let per_page = stats.total_index_entries as f64 / stats.total_pages as f64;
        let _ = writeln!(out, "  Distinct words per page: {:.1}", per_page);
    }

    if let Some(session) = &stats.latest_session {
        let _ = writeln!(out, "\nLatest Session:");
        let _ = writeln!(
            out,
            "  #{} {} (started {})",
            session.id,
            session.status.to_db_string(),
            session.started_at
        );
        if let Some(finished) = &session.finished_at {
            let _ = writeln!(out, "  Finished: {}", finished);
        }
        let _ = writeln!(
            out,
            "  Indexed: {}, failed: {}, dropped links: {}",
            session.summary.pages_indexed,
            session.summary.pages_failed,
            session.summary.links_dropped
        );
    }

    if !stats.top_words.is_empty() {
        let _ = writeln!(out, "\nTop Words:");
        for (word, total) in &stats.top_words {
            let _ = writeln!(out, "  {:<20} {}", word, total);
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    print!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SessionStatus, SessionSummary, SqliteStorage};

    #[test]
    fn test_empty_database() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage, 5).unwrap();

        assert_eq!(stats.total_pages, 0);
        assert!(stats.latest_session.is_none());
        assert!(stats.top_words.is_empty());
        assert!(format_statistics(&stats).contains("Pages indexed: 0"));
    }

    #[test]
    fn test_statistics_from_store() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_index_entry("rust", "https://a.test/1", 4).unwrap();
        storage.upsert_index_entry("rust", "https://a.test/2", 2).unwrap();
        storage.upsert_index_entry("crab", "https://a.test/1", 1).unwrap();
        storage.record_visited("https://a.test/1").unwrap();
        let id = storage.create_session("hash").unwrap();
        storage
            .complete_session(
                id,
                SessionStatus::Completed,
                &SessionSummary {
                    pages_indexed: 2,
                    pages_failed: 0,
                    links_dropped: 0,
                },
            )
            .unwrap();

        let stats = load_statistics(&storage, 1).unwrap();

        assert_eq!(stats.total_words, 2);
        assert_eq!(stats.total_index_entries, 3);
        assert_eq!(stats.total_visited, 1);
        assert_eq!(stats.top_words, vec![("rust".to_string(), 6)]);

        let text = format_statistics(&stats);
        assert!(text.contains("completed"));
        assert!(text.contains("rust"));
    }
}
