//! Collaborator interfaces the crawler depends on
//!
//! The crawler never talks HTTP directly; it asks a [`Board`] for listing pages
//! and post details, and a [`SourceDirectory`] for the sources to crawl. The
//! production implementations live in `crate::crawler`.

use crate::board::{Listing, Post, PostRef, Source};
use crate::FetchError;
use async_trait::async_trait;

/// Raw fetch + parse capability for one board
#[async_trait]
pub trait Board: Send + Sync {
    /// Fetches listing page `page` (1-based) of `source`
    ///
    /// Entries are returned exactly as displayed, newest first.
    async fn listing(&self, source: &Source, page: u32) -> Result<Listing, FetchError>;

    /// Fetches and parses the full record behind `post_ref`
    ///
    /// `display_rank` on the returned post is left at 0; the page fetcher
    /// assigns it.
    async fn post(&self, post_ref: &PostRef) -> Result<Post, FetchError>;
}

/// Bulk enumeration of the sources to crawl
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// Returns every source, sorted and without duplicates
    async fn list_sources(&self) -> Result<Vec<Source>, FetchError>;
}
