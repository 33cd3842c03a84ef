//! In-memory board for exercising the crawler without a network

use crate::board::{Board, Listing, Post, PostRef, Source, BOARD_TIME_FORMAT};
use crate::FetchError;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Pages of `(post id, "YYYY.MM.DD HH:MM")`, page 1 first, newest first
pub type FakePages = Vec<Vec<(u64, &'static str)>>;

pub struct FakeBoard {
    pages: Mutex<FakePages>,
    failing_posts: HashSet<u64>,
    failing_pages: HashSet<u32>,
    failing_sources: HashSet<Source>,
    page_delays: HashMap<u32, Duration>,
    listing_calls: Mutex<Vec<u32>>,
    post_calls: AtomicUsize,
}

impl FakeBoard {
    pub fn new(pages: FakePages) -> Self {
        Self {
            pages: Mutex::new(pages),
            failing_posts: HashSet::new(),
            failing_pages: HashSet::new(),
            failing_sources: HashSet::new(),
            page_delays: HashMap::new(),
            listing_calls: Mutex::new(Vec::new()),
            post_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_post(mut self, post_id: u64) -> Self {
        self.failing_posts.insert(post_id);
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// Fails every listing request of `source`
    pub fn failing_source(mut self, source: &str) -> Self {
        self.failing_sources.insert(Source::new(source));
        self
    }

    /// Delays the listing response of `page`
    pub fn slow_page(mut self, page: u32, millis: u64) -> Self {
        self.page_delays.insert(page, Duration::from_millis(millis));
        self
    }

    /// Replaces the board content, e.g. to simulate new posts between runs
    pub fn set_pages(&self, pages: FakePages) {
        *self.pages.lock().unwrap() = pages;
    }

    /// Listing pages requested so far, in ascending order
    pub fn listed_pages(&self) -> Vec<u32> {
        let mut pages = self.listing_calls.lock().unwrap().clone();
        pages.sort_unstable();
        pages
    }

    pub fn post_fetches(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    /// Builds a listing without recording a call
    pub fn listing_now(&self, source: &Source, page: u32) -> Listing {
        let pages = self.pages.lock().unwrap();
        let entries = pages
            .get(page as usize - 1)
            .map(|rows| {
                rows.iter()
                    .map(|(id, minute)| PostRef {
                        source: source.clone(),
                        post_id: *id,
                        url: Url::parse(&format!(
                            "https://board.test/read?code={}&nid={}",
                            source, id
                        ))
                        .unwrap(),
                        title: format!("post {}", id),
                        listed_at: Some(minute_of(minute)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Listing {
            entries,
            last_page: pages.len().max(1) as u32,
        }
    }

    fn minute_for(&self, post_id: u64) -> Option<NaiveDateTime> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .find(|(id, _)| *id == post_id)
            .map(|(_, minute)| minute_of(minute))
    }
}

pub fn minute_of(minute: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(minute, BOARD_TIME_FORMAT).unwrap()
}

#[async_trait]
impl Board for FakeBoard {
    async fn listing(&self, source: &Source, page: u32) -> Result<Listing, FetchError> {
        self.listing_calls.lock().unwrap().push(page);

        if let Some(delay) = self.page_delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing_pages.contains(&page) || self.failing_sources.contains(source) {
            return Err(FetchError::Status {
                url: format!("https://board.test/list?code={}&page={}", source, page),
                status: 500,
            });
        }

        Ok(self.listing_now(source, page))
    }

    async fn post(&self, post_ref: &PostRef) -> Result<Post, FetchError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_posts.contains(&post_ref.post_id) {
            return Err(FetchError::Network {
                url: post_ref.url.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let posted_at = self.minute_for(post_ref.post_id).ok_or_else(|| FetchError::Status {
            url: post_ref.url.to_string(),
            status: 404,
        })?;

        Ok(Post {
            id: post_ref.post_id,
            posted_at,
            display_rank: 0,
            title: post_ref.title.clone(),
            views: post_ref.post_id * 10,
            agree: 1,
            disagree: 0,
            opinion: None,
            body: format!("body of {}", post_ref.post_id),
        })
    }
}
