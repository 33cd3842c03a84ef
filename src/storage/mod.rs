//! Storage module for persisting harvested posts
//!
//! Posts, per-source checkpoints, runs and per-source outcomes all live in one
//! SQLite file. A source's posts and its checkpoint only ever change together,
//! inside one transaction.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::board::{Identity, Source};
use crate::HarvestError;

use std::path::Path;

/// Opens the harvest database at `path`, creating the file and its parent
/// directory on first use
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// A post as stored in the database
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPost {
    pub source: Source,
    pub post_id: u64,
    pub posted_at: String,
    pub sequence: u64,
    pub title: String,
    pub views: u64,
    pub agree: u64,
    pub disagree: u64,
    pub opinion: Option<String>,
    pub body: String,
    pub run_id: Option<i64>,
}

/// Result of committing one source's merged posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// Posts newly written
    pub committed: usize,

    /// Posts dropped for being at or before the stored checkpoint
    pub already_known: usize,

    /// Checkpoint after the commit
    pub latest: Option<Identity>,
}

/// Per-source row of the statistics report
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub source: Source,
    pub posts: u64,
    pub checkpoint: Option<String>,
    pub updated_at: Option<String>,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// How one source ended in a run, as recorded in `source_outcomes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutcomeKind {
    UpToDate,
    Committed,
    Failed,
}

impl OutcomeKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::UpToDate => "up_to_date",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "up_to_date" => Some(Self::UpToDate),
            "committed" => Some(Self::Committed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
