//! Storage traits and error types
//!
//! This module defines the persistence sink interface used by the crawl
//! pipeline and its associated error types.

use crate::storage::{IndexEntry, PageRecord, SessionRecord, SessionStatus, SessionSummary};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence sink for pages, index rows and the visited set
///
/// All methods take `&self` and must be safe to call concurrently from
/// several workers; implementations provide their own row-level guarantees.
pub trait Storage: Send + Sync {
    // ===== Crawl Output =====

    /// Inserts or replaces the page record for `page.url`
    fn upsert_page(&self, page: &PageRecord) -> StorageResult<()>;

    /// Adds `delta` to the frequency of (word, url), creating the row if absent
    fn upsert_index_entry(&self, word: &str, url: &str, delta: u64) -> StorageResult<()>;

    /// Applies a batch of additive index upserts
    ///
    /// The default applies entries one by one; backends may override this to
    /// make the batch atomic.
    fn upsert_index_entries(&self, entries: &[IndexEntry]) -> StorageResult<()> {
        for entry in entries {
            self.upsert_index_entry(&entry.word, &entry.url, entry.frequency)?;
        }
        Ok(())
    }

    /// Records that `url` has been visited
    ///
    /// Set semantics: repeated calls are harmless. Returns `true` only when
    /// the URL was not recorded before.
    fn record_visited(&self, url: &str) -> StorageResult<bool>;

    // ===== Session Management =====

    /// Creates a new crawl session and returns its ID
    fn create_session(&self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a session finished with the given status and counters
    fn complete_session(
        &self,
        session_id: i64,
        status: SessionStatus,
        summary: &SessionSummary,
    ) -> StorageResult<()>;

    /// Gets a session by ID
    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord>;

    /// Gets the most recent session
    fn latest_session(&self) -> StorageResult<Option<SessionRecord>>;

    // ===== Reads =====

    /// Gets the page record for a URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets the stored frequency of a word on a URL
    fn index_frequency(&self, word: &str, url: &str) -> StorageResult<Option<u64>>;

    /// Gets every (url, frequency) pair stored for a word, highest frequency first
    fn postings_for_word(&self, word: &str) -> StorageResult<Vec<(String, u64)>>;

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64>;

    fn count_words(&self) -> StorageResult<u64>;

    fn count_index_entries(&self) -> StorageResult<u64>;

    fn count_visited(&self) -> StorageResult<u64>;

    fn count_sessions(&self) -> StorageResult<u64>;

    /// Gets the most frequent words across all URLs
    fn top_words(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
