//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Ripple-Index database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl sessions
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_indexed INTEGER NOT NULL DEFAULT 0,
    pages_failed INTEGER NOT NULL DEFAULT 0,
    links_dropped INTEGER NOT NULL DEFAULT 0
);

-- One row per successfully fetched and parsed URL
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    title TEXT,
    description TEXT,
    fetched_at TEXT NOT NULL
);

-- Word dictionary
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE
);

-- Reverse index: word -> url with occurrence count
CREATE TABLE IF NOT EXISTS reverse_index (
    word_id INTEGER NOT NULL REFERENCES words(id),
    url TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    PRIMARY KEY (word_id, url)
);

CREATE INDEX IF NOT EXISTS idx_reverse_index_url ON reverse_index(url);

-- Set of URLs any crawling unit has visited
CREATE TABLE IF NOT EXISTS visited (
    url TEXT PRIMARY KEY,
    visited_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
