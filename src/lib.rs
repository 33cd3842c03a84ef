//! Board-Harvest: an incremental discussion-board harvester
//!
//! This crate crawls per-symbol discussion boards page by page, stops as soon
//! as the fetched pages overlap what is already stored, restores the board's
//! chronological order and commits only the posts newer than each source's
//! checkpoint.

pub mod board;
pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Board-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while retrieving or parsing a listing page or a post
///
/// None of these are retried inside the crawler; the orchestrator abandons the
/// source and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Unexpected document shape at {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Fetch worker failed: {0}")]
    Worker(String),
}

/// Errors raised when merged pages cannot be put into a total order
#[derive(Debug, Error)]
pub enum InvariantError {
    #[error("Post {post_id} appears more than once on page {page}")]
    DuplicatePostId { post_id: u64, page: u32 },

    #[error("Page {0} was returned more than once")]
    DuplicatePage(u32),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid source code: {0}")]
    InvalidSource(String),
}

/// Result type alias for Board-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use board::{Checkpoint, Identity, IdentityKind, PageResult, Post, PostRef, Source};
pub use config::Config;
pub use crawler::{CrawlOutcome, Harvester};
