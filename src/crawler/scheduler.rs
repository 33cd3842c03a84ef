//! Pagination scheduler: fans listing pages out over a bounded worker pool
//!
//! This module handles:
//! - Dispatching listing pages in order, at most `page_workers` running at once
//! - The shared early-stop signal raised once a page is entirely known
//! - Joining every dispatched task before anything is merged
//!
//! Early stop relies on recency never increasing with the page number: once
//! one page's oldest post is at or before the checkpoint, every later page is
//! already known as well. Pages already in flight when the signal is raised
//! still complete and their results are kept. If the board breaks the ordering
//! (a later page holding newer posts) the crawl can stop early and miss those
//! posts; nothing older than the checkpoint is ever committed because of it.

use crate::board::{Board, Checkpoint, PageResult, Source};
use crate::config::CrawlerConfig;
use crate::crawler::page::fetch_page;
use crate::FetchError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Set-once, never-cleared stop flag shared by the page tasks of one crawl
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    raised: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal; returns true only for the call that raised it
    pub fn raise(&self) -> bool {
        !self.raised.swap(true, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Schedules the page fetches of one source at a time
///
/// Pages are dispatched in page order by a single loop that takes a worker
/// slot before spawning each page task. Once the early-stop signal is raised
/// no further page is dispatched, so only pages after the one that raised it
/// are spared.
#[derive(Debug, Clone)]
pub struct PaginationScheduler {
    page_workers: usize,
    item_workers: usize,
}

impl PaginationScheduler {
    pub fn new(page_workers: usize, item_workers: usize) -> Self {
        Self {
            page_workers: page_workers.max(1),
            item_workers: item_workers.max(1),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.page_workers as usize, config.item_workers as usize)
    }

    pub fn page_workers(&self) -> usize {
        self.page_workers
    }

    /// Crawls pages `1..=page_count` of `source` against `checkpoint`
    ///
    /// Returns the fetched pages in completion order. Pages never dispatched
    /// are left out. Every task is joined before returning, also on failure;
    /// the first failure is then returned and the pages fetched so far are
    /// discarded.
    ///
    /// # Arguments
    ///
    /// * `board` - Where listings and posts are fetched from
    /// * `source` - The source being crawled
    /// * `page_count` - Page count snapshot taken before the crawl
    /// * `checkpoint` - Newest identity already committed for the source
    pub async fn crawl_source(
        &self,
        board: Arc<dyn Board>,
        source: &Source,
        page_count: u32,
        checkpoint: Checkpoint,
    ) -> Result<Vec<PageResult>, FetchError> {
        let signal = CancellationSignal::new();
        let semaphore = Arc::new(Semaphore::new(self.page_workers));
        let mut tasks = JoinSet::new();

        let mut dispatched = 0u32;
        let mut first_error = None;

        for page in 1..=page_count {
            // Taken before the task exists so pages start in page order
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    first_error = Some(FetchError::Worker(e.to_string()));
                    break;
                }
            };

            if signal.is_raised() {
                break;
            }

            let board = Arc::clone(&board);
            let signal = signal.clone();
            let source = source.clone();
            let item_workers = self.item_workers;
            dispatched += 1;

            tasks.spawn(async move {
                let _permit = permit;

                let result = match fetch_page(board, &source, page, item_workers).await {
                    Ok(result) => result,
                    Err(e) => {
                        // Raised before the permit is released so the dispatcher sees it
                        signal.raise();
                        return Err(e);
                    }
                };

                if let Some(oldest) = result.oldest_identity(checkpoint.kind) {
                    if checkpoint.covers(&oldest) && signal.raise() {
                        tracing::debug!(
                            "{}: page {} reaches the checkpoint at {}, stopping",
                            source,
                            page,
                            oldest
                        );
                    }
                }

                Ok(result)
            });
        }

        let mut pages = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| FetchError::Worker(e.to_string()))
                .and_then(|outcome| outcome);

            match outcome {
                Ok(result) => pages.push(result),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        tracing::debug!(
            "{}: {} of {} pages fetched, {} never dispatched",
            source,
            pages.len(),
            page_count,
            page_count - dispatched
        );

        Ok(pages)
    }
}
