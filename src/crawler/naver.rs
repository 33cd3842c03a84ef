//! Board backed by the live discussion-board site

use crate::board::{Board, Listing, Post, PostRef, Source};
use crate::config::OriginConfig;
use crate::crawler::fetcher::fetch_document;
use crate::crawler::parser::{parse_listing, parse_post};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// `Board` implementation that fetches listing and detail pages over HTTP
pub struct NaverBoard {
    client: Client,
    board_url: Url,
}

impl NaverBoard {
    /// Creates a board rooted at `origin.base_url` + `origin.board_path`
    pub fn new(client: Client, origin: &OriginConfig) -> Result<Self, url::ParseError> {
        let board_url = Url::parse(&origin.base_url)?.join(&origin.board_path)?;
        Ok(Self { client, board_url })
    }

    /// URL of listing page `page` for `source`
    pub fn listing_url(&self, source: &Source, page: u32) -> Url {
        let mut url = self.board_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("code", source.as_str())
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl Board for NaverBoard {
    async fn listing(&self, source: &Source, page: u32) -> Result<Listing, FetchError> {
        let url = self.listing_url(source, page);
        let html = fetch_document(&self.client, &url).await?;
        parse_listing(&html, &url, source)
    }

    async fn post(&self, post_ref: &PostRef) -> Result<Post, FetchError> {
        let html = fetch_document(&self.client, &post_ref.url).await?;
        parse_post(&html, post_ref)
    }
}
