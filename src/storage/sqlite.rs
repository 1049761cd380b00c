//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{IndexEntry, PageRecord, SessionRecord, SessionStatus, SessionSummary};
use crate::RippleError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const UPSERT_WORD_SQL: &str = "INSERT OR IGNORE INTO words (word) VALUES (?1)";

const UPSERT_INDEX_SQL: &str = "INSERT INTO reverse_index (word_id, url, frequency)
     VALUES ((SELECT id FROM words WHERE word = ?1), ?2, ?3)
     ON CONFLICT(word_id, url) DO UPDATE SET frequency = frequency + excluded.frequency";

const SESSION_COLUMNS: &str = "id, started_at, finished_at, config_hash, status,
     pages_indexed, pages_failed, links_dropped";

/// SQLite storage backend
///
/// The connection sits behind a mutex so one store can be shared by all
/// workers of a pool.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and initializes the schema
    pub fn new(path: &Path) -> Result<Self, RippleError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, RippleError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: SessionStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(SessionStatus::Failed),
        summary: SessionSummary {
            pages_indexed: row.get::<_, i64>(5)? as u64,
            pages_failed: row.get::<_, i64>(6)? as u64,
            links_dropped: row.get::<_, i64>(7)? as u64,
        },
    })
}

impl Storage for SqliteStorage {
    // ===== Crawl Output =====

    fn upsert_page(&self, page: &PageRecord) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pages (url, title, description, fetched_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO NOTHING",
            params![page.url, page.title, page.description, page.fetched_at],
        )?;
        Ok(())
    }

    fn upsert_index_entry(&self, word: &str, url: &str, delta: u64) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(UPSERT_WORD_SQL, params![word])?;
        conn.execute(UPSERT_INDEX_SQL, params![word, url, delta as i64])?;
        Ok(())
    }

    fn upsert_index_entries(&self, entries: &[IndexEntry]) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut word_stmt = tx.prepare_cached(UPSERT_WORD_SQL)?;
            let mut index_stmt = tx.prepare_cached(UPSERT_INDEX_SQL)?;
            for entry in entries {
                word_stmt.execute(params![entry.word])?;
                index_stmt.execute(params![entry.word, entry.url, entry.frequency as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn record_visited(&self, url: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO visited (url, visited_at) VALUES (?1, ?2)",
            params![url, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    // ===== Session Management =====

    fn create_session(&self, config_hash: &str) -> StorageResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![
                Utc::now().to_rfc3339(),
                config_hash,
                SessionStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn complete_session(
        &self,
        session_id: i64,
        status: SessionStatus,
        summary: &SessionSummary,
    ) -> StorageResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE sessions SET status = ?1, finished_at = ?2, pages_indexed = ?3,
             pages_failed = ?4, links_dropped = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                Utc::now().to_rfc3339(),
                summary.pages_indexed as i64,
                summary.pages_failed as i64,
                summary.links_dropped as i64,
                session_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(())
    }

    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
            params![session_id],
            session_from_row,
        )
        .optional()?
        .ok_or(StorageError::SessionNotFound(session_id))
    }

    fn latest_session(&self) -> StorageResult<Option<SessionRecord>> {
        let conn = self.lock()?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {} FROM sessions ORDER BY id DESC LIMIT 1",
                    SESSION_COLUMNS
                ),
                [],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    // ===== Reads =====

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let conn = self.lock()?;
        let page = conn
            .query_row(
                "SELECT url, title, description, fetched_at FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(PageRecord {
                        url: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                        fetched_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(page)
    }

    fn index_frequency(&self, word: &str, url: &str) -> StorageResult<Option<u64>> {
        let conn = self.lock()?;
        let frequency: Option<i64> = conn
            .query_row(
                "SELECT r.frequency FROM reverse_index r JOIN words w ON w.id = r.word_id
                 WHERE w.word = ?1 AND r.url = ?2",
                params![word, url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(frequency.map(|f| f as u64))
    }

    fn postings_for_word(&self, word: &str) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT r.url, r.frequency FROM reverse_index r JOIN words w ON w.id = r.word_id
             WHERE w.word = ?1 ORDER BY r.frequency DESC, r.url",
        )?;

        let postings = stmt
            .query_map(params![word], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(postings)
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64> {
        count(&*self.lock()?, "SELECT COUNT(*) FROM pages")
    }

    fn count_words(&self) -> StorageResult<u64> {
        count(&*self.lock()?, "SELECT COUNT(*) FROM words")
    }

    fn count_index_entries(&self) -> StorageResult<u64> {
        count(&*self.lock()?, "SELECT COUNT(*) FROM reverse_index")
    }

    fn count_visited(&self) -> StorageResult<u64> {
        count(&*self.lock()?, "SELECT COUNT(*) FROM visited")
    }

    fn count_sessions(&self) -> StorageResult<u64> {
        count(&*self.lock()?, "SELECT COUNT(*) FROM sessions")
    }

    fn top_words(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT w.word, SUM(r.frequency) AS total FROM reverse_index r
             JOIN words w ON w.id = r.word_id
             GROUP BY w.word ORDER BY total DESC, w.word LIMIT ?1",
        )?;

        let words = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }
}

fn count(conn: &Connection, sql: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count as u64)
}
