//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::board::{Checkpoint, Identity, IdentityKind, OrderedPost, Source};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CommitSummary, OutcomeKind, RunRecord, RunStatus, SourceSummary, StoredPost,
};
use crate::HarvestError;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// Format of post timestamps and timestamp checkpoints in the database
const STORED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

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

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn encode_identity(identity: &Identity) -> String {
    match identity {
        Identity::PostId(id) => id.to_string(),
        Identity::Timestamp(at) => at.format(STORED_TIME_FORMAT).to_string(),
    }
}

fn decode_identity(kind: IdentityKind, value: &str) -> Option<Identity> {
    match kind {
        IdentityKind::PostId => value.parse().ok().map(Identity::PostId),
        IdentityKind::Timestamp => NaiveDateTime::parse_from_str(value, STORED_TIME_FORMAT)
            .ok()
            .map(Identity::Timestamp),
    }
}

/// Reads the checkpoint of `source`, refusing one recorded under another kind
fn read_checkpoint(
    conn: &Connection,
    source: &Source,
    kind: IdentityKind,
) -> StorageResult<Checkpoint> {
    let stored: Option<(String, String)> = conn
        .query_row(
            "SELECT identity_kind, latest FROM checkpoints WHERE source = ?1",
            params![source.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((stored_kind, latest)) = stored else {
        return Ok(Checkpoint::none(kind));
    };

    if IdentityKind::from_db_string(&stored_kind) != Some(kind) {
        return Err(StorageError::IdentityMismatch {
            code: source.to_string(),
            stored: stored_kind,
            requested: kind.to_db_string().to_string(),
        });
    }

    let identity = decode_identity(kind, &latest).ok_or_else(|| StorageError::CorruptCheckpoint {
        code: source.to_string(),
        value: latest.clone(),
    })?;

    Ok(Checkpoint::at(identity))
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn record_outcome(
        &mut self,
        run_id: i64,
        source: &Source,
        kind: OutcomeKind,
        committed: usize,
        detail: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO source_outcomes (run_id, source, outcome, committed, detail, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                source.as_str(),
                kind.to_db_string(),
                committed as i64,
                detail,
                now
            ],
        )?;
        Ok(())
    }

    // ===== Checkpoint Store =====

    fn latest_checkpoint(&self, source: &Source, kind: IdentityKind) -> StorageResult<Checkpoint> {
        read_checkpoint(&self.conn, source, kind)
    }

    fn commit(
        &mut self,
        source: &Source,
        kind: IdentityKind,
        posts: &[OrderedPost],
        run_id: Option<i64>,
    ) -> StorageResult<CommitSummary> {
        let tx = self.conn.transaction()?;

        // Re-read inside the transaction; the caller's snapshot may be stale
        let checkpoint = read_checkpoint(&tx, source, kind)?;
        let fresh: Vec<&OrderedPost> = posts
            .iter()
            .filter(|entry| !checkpoint.covers(&entry.identity(kind)))
            .collect();
        let already_known = posts.len() - fresh.len();

        let Some(latest) = fresh.iter().map(|entry| entry.identity(kind)).max() else {
            tx.commit()?;
            return Ok(CommitSummary {
                committed: 0,
                already_known,
                latest: checkpoint.latest,
            });
        };

        let now = Utc::now().to_rfc3339();
        let mut committed = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO posts
                 (source, post_id, posted_at, sequence, title, views, agree, disagree,
                  opinion, body, run_id, committed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;

            for entry in &fresh {
                let post = &entry.post;
                committed += stmt.execute(params![
                    source.as_str(),
                    post.id as i64,
                    post.posted_at.format(STORED_TIME_FORMAT).to_string(),
                    entry.sequence as i64,
                    post.title,
                    post.views as i64,
                    post.agree as i64,
                    post.disagree as i64,
                    post.opinion,
                    post.body,
                    run_id,
                    now,
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO checkpoints (source, identity_kind, latest, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source) DO UPDATE SET
                identity_kind = excluded.identity_kind,
                latest = excluded.latest,
                updated_at = excluded.updated_at",
            params![
                source.as_str(),
                kind.to_db_string(),
                encode_identity(&latest),
                now
            ],
        )?;

        tx.commit()?;

        Ok(CommitSummary {
            committed,
            already_known,
            latest: Some(latest),
        })
    }

    fn get_posts(&self, source: &Source) -> StorageResult<Vec<StoredPost>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, post_id, posted_at, sequence, title, views, agree, disagree,
             opinion, body, run_id
             FROM posts WHERE source = ?1 ORDER BY post_id",
        )?;

        let posts = stmt
            .query_map(params![source.as_str()], |row| {
                Ok(StoredPost {
                    source: Source::new(row.get::<_, String>(0)?),
                    post_id: row.get::<_, i64>(1)? as u64,
                    posted_at: row.get(2)?,
                    sequence: row.get::<_, i64>(3)? as u64,
                    title: row.get(4)?,
                    views: row.get::<_, i64>(5)? as u64,
                    agree: row.get::<_, i64>(6)? as u64,
                    disagree: row.get::<_, i64>(7)? as u64,
                    opinion: row.get(8)?,
                    body: row.get(9)?,
                    run_id: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    // ===== Statistics =====

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_posts(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_checkpoints(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM checkpoints", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn get_source_summaries(&self) -> StorageResult<Vec<SourceSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.source,
                    (SELECT COUNT(*) FROM posts p WHERE p.source = s.source),
                    c.identity_kind, c.latest, c.updated_at
             FROM (SELECT source FROM posts UNION SELECT source FROM checkpoints) s
             LEFT JOIN checkpoints c ON c.source = s.source
             ORDER BY s.source",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                let kind: Option<String> = row.get(2)?;
                let latest: Option<String> = row.get(3)?;

                // Shown as the board shows it when it decodes, raw otherwise
                let checkpoint = latest.map(|value| {
                    kind.as_deref()
                        .and_then(IdentityKind::from_db_string)
                        .and_then(|kind| decode_identity(kind, &value))
                        .map(|identity| identity.to_string())
                        .unwrap_or(value)
                });

                Ok(SourceSummary {
                    source: Source::new(row.get::<_, String>(0)?),
                    posts: row.get::<_, i64>(1)? as u64,
                    checkpoint,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    fn get_outcome_counts(&self, run_id: i64) -> StorageResult<HashMap<OutcomeKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT outcome, COUNT(*) FROM source_outcomes WHERE run_id = ?1 GROUP BY outcome",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (outcome, count) = row?;
            match OutcomeKind::from_db_string(&outcome) {
                Some(kind) => {
                    counts.insert(kind, count as u64);
                }
                None => {
                    return Err(StorageError::Database(format!(
                        "unknown outcome '{}' in run {}",
                        outcome, run_id
                    )))
                }
            }
        }

        Ok(counts)
    }
}
