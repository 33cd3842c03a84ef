//! Page fetcher: one listing page and all of its posts
//!
//! The listing is fetched first, then every post on it is fetched on a small
//! worker pool of its own, independent of the page-level pool. A page is only
//! returned once every post on it has been fetched; one failed post fails the
//! whole page.

use crate::board::{Board, PageResult, Source};
use crate::crawler::item::fetch_item;
use crate::FetchError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fetches listing page `page` of `source` with up to `item_workers` posts in flight
///
/// Posts come back in the page's native newest-first order, each tagged with
/// its index in that order as `display_rank`.
pub async fn fetch_page(
    board: Arc<dyn Board>,
    source: &Source,
    page: u32,
    item_workers: usize,
) -> Result<PageResult, FetchError> {
    let listing = board.listing(source, page).await?;
    tracing::trace!(
        "{} page {}: {} posts listed",
        source,
        page,
        listing.entries.len()
    );

    let semaphore = Arc::new(Semaphore::new(item_workers.max(1)));
    let mut tasks = JoinSet::new();

    for (display_rank, post_ref) in listing.entries.into_iter().enumerate() {
        let board = Arc::clone(&board);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| FetchError::Worker(e.to_string()))?;
            fetch_item(board.as_ref(), &post_ref, display_rank).await
        });
    }

    let mut posts = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        // Returning early drops the set, which aborts the posts still in flight
        let post = joined.map_err(|e| FetchError::Worker(e.to_string()))??;
        posts.push(post);
    }

    posts.sort_by_key(|post| post.display_rank);

    Ok(PageResult { page, posts })
}
