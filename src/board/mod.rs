//! Board data model and collaborator traits
//!
//! This module defines what the crawler works with:
//! - Sources, post references and harvested posts
//! - Identities and per-source checkpoints
//! - The `Board` and `SourceDirectory` interfaces the crawler calls out to

mod model;
mod traits;

pub use model::{
    Checkpoint, Identity, IdentityKind, Listing, OrderedPost, PageResult, Post, PostRef, Source,
    BOARD_TIME_FORMAT,
};
pub use traits::{Board, SourceDirectory};
