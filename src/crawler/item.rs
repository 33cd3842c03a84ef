//! Item fetcher: retrieves one post behind a listing reference

use crate::board::{Board, Post, PostRef};
use crate::FetchError;

/// Fetches and parses a single post, tagging it with its display rank
///
/// No caching and no retry: any transport or parse failure is returned as is.
/// A detail page that resolves to a different post than the one listed is
/// treated as an unexpected document shape.
pub async fn fetch_item(
    board: &dyn Board,
    post_ref: &PostRef,
    display_rank: usize,
) -> Result<Post, FetchError> {
    let mut post = board.post(post_ref).await?;

    if post.id != post_ref.post_id {
        return Err(FetchError::Parse {
            url: post_ref.url.to_string(),
            message: format!(
                "listed as post {} but detail page is post {}",
                post_ref.post_id, post.id
            ),
        });
    }

    post.display_rank = display_rank;
    Ok(post)
}
