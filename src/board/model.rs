//! Strongly-typed records produced while crawling a board

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use url::Url;

/// Format the board uses for post timestamps (minute granularity)
pub const BOARD_TIME_FORMAT: &str = "%Y.%m.%d %H:%M";

/// One crawlable feed, e.g. a stock symbol's discussion board
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Source(String);

impl Source {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Source {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Which post field orders posts and detects "already known"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityKind {
    /// The board's numeric post id (strictly increasing with recency)
    #[default]
    PostId,

    /// The reported minute-granularity timestamp
    Timestamp,
}

impl IdentityKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::PostId => "post_id",
            Self::Timestamp => "timestamp",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "post_id" => Some(Self::PostId),
            "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }
}

/// A post's identity under one [`IdentityKind`]
///
/// Values are only ever compared with values of the same kind; storage refuses
/// to hand out a checkpoint recorded under a different kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    PostId(u64),
    Timestamp(NaiveDateTime),
}

impl Identity {
    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::PostId(_) => IdentityKind::PostId,
            Self::Timestamp(_) => IdentityKind::Timestamp,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostId(id) => write!(f, "post #{}", id),
            Self::Timestamp(at) => write!(f, "{}", at.format(BOARD_TIME_FORMAT)),
        }
    }
}

/// Snapshot of the newest identity already committed for a source
///
/// Read once before a source is crawled and never mutated while it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub kind: IdentityKind,
    pub latest: Option<Identity>,
}

impl Checkpoint {
    /// A checkpoint for a source that has never been committed
    pub fn none(kind: IdentityKind) -> Self {
        Self { kind, latest: None }
    }

    pub fn at(latest: Identity) -> Self {
        Self {
            kind: latest.kind(),
            latest: Some(latest),
        }
    }

    /// Returns true if `identity` is at or before the checkpoint
    pub fn covers(&self, identity: &Identity) -> bool {
        self.latest
            .as_ref()
            .map(|latest| identity <= latest)
            .unwrap_or(false)
    }
}

/// Reference to a post as listed on a board page
#[derive(Debug, Clone, PartialEq)]
pub struct PostRef {
    pub source: Source,

    /// The board's post id (`nid`)
    pub post_id: u64,

    /// Absolute URL of the post's detail page
    pub url: Url,

    pub title: String,

    /// Time shown in the listing row, when the row carries one
    pub listed_at: Option<NaiveDateTime>,
}

/// One harvested post
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: u64,
    pub posted_at: NaiveDateTime,

    /// Position within its page's newest-first listing
    pub display_rank: usize,

    pub title: String,
    pub views: u64,
    pub agree: u64,
    pub disagree: u64,

    /// Stated opinion; `None` when the author gave none
    pub opinion: Option<String>,

    pub body: String,
}

impl Post {
    pub fn identity(&self, kind: IdentityKind) -> Identity {
        match kind {
            IdentityKind::PostId => Identity::PostId(self.id),
            IdentityKind::Timestamp => Identity::Timestamp(self.posted_at),
        }
    }
}

/// Posts of one listing page in display order
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub page: u32,
    pub posts: Vec<Post>,
}

impl PageResult {
    /// Least-recent identity on the page, `None` for an empty page
    pub fn oldest_identity(&self, kind: IdentityKind) -> Option<Identity> {
        self.posts.iter().map(|post| post.identity(kind)).min()
    }
}

/// A listing page as parsed, before any post is fetched
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Post references in display order (newest first)
    pub entries: Vec<PostRef>,

    /// Number of listing pages the board reported when this page was served
    pub last_page: u32,
}

impl Listing {
    /// Newest identity listed on the page
    ///
    /// In timestamp mode only rows carrying a listed time are considered.
    pub fn newest_identity(&self, kind: IdentityKind) -> Option<Identity> {
        match kind {
            IdentityKind::PostId => self
                .entries
                .iter()
                .map(|entry| Identity::PostId(entry.post_id))
                .max(),
            IdentityKind::Timestamp => self
                .entries
                .iter()
                .filter_map(|entry| entry.listed_at.map(Identity::Timestamp))
                .max(),
        }
    }
}

/// A post placed in the merged sequence
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedPost {
    /// `total - 1 - overall display rank`; larger is further up the board
    pub sequence: u64,
    pub post: Post,
}

impl OrderedPost {
    pub fn identity(&self, kind: IdentityKind) -> Identity {
        self.post.identity(kind)
    }

    /// Chronological order: timestamp first, then the reversed display rank
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.post
            .posted_at
            .cmp(&other.post.posted_at)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}
