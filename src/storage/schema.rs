//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Board-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Harvested posts, one row per source and board post id
CREATE TABLE IF NOT EXISTS posts (
    source TEXT NOT NULL,
    post_id INTEGER NOT NULL,
    posted_at TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    title TEXT NOT NULL,
    views INTEGER NOT NULL DEFAULT 0,
    agree INTEGER NOT NULL DEFAULT 0,
    disagree INTEGER NOT NULL DEFAULT 0,
    opinion TEXT,
    body TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id),
    committed_at TEXT NOT NULL,
    PRIMARY KEY (source, post_id)
);

CREATE INDEX IF NOT EXISTS idx_posts_posted_at ON posts(source, posted_at);

-- Newest committed identity per source
CREATE TABLE IF NOT EXISTS checkpoints (
    source TEXT PRIMARY KEY,
    identity_kind TEXT NOT NULL,
    latest TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- How each source ended in each run
CREATE TABLE IF NOT EXISTS source_outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    source TEXT NOT NULL,
    outcome TEXT NOT NULL,
    committed INTEGER NOT NULL DEFAULT 0,
    detail TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_source_outcomes_run ON source_outcomes(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
