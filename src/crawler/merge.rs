//! Merge/reorder stage: rebuilds the board's chronological order
//!
//! Pages arrive in whatever order their fetches completed. They are first put
//! back into page order and concatenated, which reproduces the board's global
//! newest-first listing. Every post then gets a sequence number
//! `total - 1 - overall_rank`, so the bottom of the last page is 0. A post
//! repeated on a later page keeps only its first copy, whatever the identity.
//!
//! - Post-id identity: sort by id. Ids are a total order on their own.
//! - Timestamp identity: sort by (timestamp, sequence). Posts sharing a
//!   minute keep the order the board displayed them in, oldest first.

use crate::board::{IdentityKind, OrderedPost, PageResult};
use crate::InvariantError;
use std::collections::{HashMap, HashSet};

/// Merges fetched pages into one ascending, identity-unique sequence
///
/// # Errors
///
/// * `InvariantError::DuplicatePage` - the same page number was returned twice
/// * `InvariantError::DuplicatePostId` - a page lists the same post twice
pub fn merge(
    mut pages: Vec<PageResult>,
    kind: IdentityKind,
) -> Result<Vec<OrderedPost>, InvariantError> {
    pages.sort_by_key(|page| page.page);
    if let Some(pair) = pages.windows(2).find(|pair| pair[0].page == pair[1].page) {
        return Err(InvariantError::DuplicatePage(pair[0].page));
    }

    let total = pages.iter().map(|page| page.posts.len()).sum::<usize>();
    let mut ordered = Vec::with_capacity(total);
    let mut overall_rank = 0usize;

    for page in pages {
        let mut on_page = HashSet::new();
        for post in page.posts {
            if !on_page.insert(post.id) {
                return Err(InvariantError::DuplicatePostId {
                    post_id: post.id,
                    page: page.page,
                });
            }

            ordered.push((page.page, OrderedPost {
                sequence: (total - 1 - overall_rank) as u64,
                post,
            }));
            overall_rank += 1;
        }
    }

    let mut ordered = dedup_shifted_posts(ordered);

    match kind {
        IdentityKind::PostId => ordered.sort_by_key(|entry| entry.post.id),
        IdentityKind::Timestamp => ordered.sort_by(OrderedPost::chronological_cmp),
    }

    Ok(ordered)
}

/// Drops repeats of a post seen on an earlier page
///
/// New posts arriving mid-crawl push older ones down, so the last post of page
/// `p` can show up again at the top of page `p + 1`. The copy from the lowest
/// page wins.
fn dedup_shifted_posts(entries: Vec<(u32, OrderedPost)>) -> Vec<OrderedPost> {
    let mut first_page: HashMap<u64, u32> = HashMap::new();
    let mut kept = Vec::with_capacity(entries.len());

    for (page, entry) in entries {
        match first_page.get(&entry.post.id) {
            Some(seen_on) => {
                tracing::debug!(
                    "post {} on page {} already seen on page {}, dropped",
                    entry.post.id,
                    page,
                    seen_on
                );
            }
            None => {
                first_page.insert(entry.post.id, page);
                kept.push(entry);
            }
        }
    }

    kept
}
