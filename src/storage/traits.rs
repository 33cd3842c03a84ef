//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::board::{Checkpoint, IdentityKind, OrderedPost, Source};
use crate::storage::{CommitSummary, OutcomeKind, RunRecord, RunStatus, SourceSummary, StoredPost};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Checkpoint for {code} was recorded by {stored}, cannot be read by {requested}")]
    IdentityMismatch {
        code: String,
        stored: String,
        requested: String,
    },

    #[error("Corrupt checkpoint for {code}: {value}")]
    CorruptCheckpoint { code: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Checkpoints are only ever read before a source is crawled and written by
/// [`Storage::commit`] after it; the crawl itself never touches storage.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Closes a run with a final status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Records how one source ended within a run
    fn record_outcome(
        &mut self,
        run_id: i64,
        source: &Source,
        kind: OutcomeKind,
        committed: usize,
        detail: Option<&str>,
    ) -> StorageResult<()>;

    // ===== Checkpoint Store =====

    /// Returns the newest identity committed for `source`
    ///
    /// A source never committed yields a checkpoint with no identity.
    ///
    /// # Errors
    ///
    /// `StorageError::IdentityMismatch` if the checkpoint was recorded under
    /// a different identity kind than `kind`.
    fn latest_checkpoint(&self, source: &Source, kind: IdentityKind) -> StorageResult<Checkpoint>;

    /// Persists the merged posts of one source
    ///
    /// Posts at or before the stored checkpoint are dropped first, whatever the
    /// crawler already filtered. The remaining posts and the new checkpoint
    /// (their newest identity) are written in one transaction; nothing is
    /// written if the commit fails.
    ///
    /// # Arguments
    ///
    /// * `source` - The source the posts belong to
    /// * `kind` - Identity kind used for the checkpoint
    /// * `posts` - Merged posts in ascending identity order
    /// * `run_id` - Run the posts were harvested in
    fn commit(
        &mut self,
        source: &Source,
        kind: IdentityKind,
        posts: &[OrderedPost],
        run_id: Option<i64>,
    ) -> StorageResult<CommitSummary>;

    /// Gets every stored post of a source in ascending post id order
    fn get_posts(&self, source: &Source) -> StorageResult<Vec<StoredPost>>;

    // ===== Statistics =====

    /// Counts recorded runs
    fn count_runs(&self) -> StorageResult<u64>;

    /// Counts stored posts across all sources
    fn count_posts(&self) -> StorageResult<u64>;

    /// Counts sources holding a checkpoint
    fn count_checkpoints(&self) -> StorageResult<u64>;

    /// Gets one summary per source with stored posts or a checkpoint
    ///
    /// Returns summaries sorted by source
    fn get_source_summaries(&self) -> StorageResult<Vec<SourceSummary>>;

    /// Gets the outcome breakdown of one run (outcome -> number of sources)
    fn get_outcome_counts(&self, run_id: i64) -> StorageResult<HashMap<OutcomeKind, u64>>;
}
