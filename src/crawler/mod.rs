//! Crawler module for incremental board harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and HTML parsing of listings, posts and the source list
//! - The item and page fetchers with their own worker pools
//! - Page scheduling with the early-stop signal
//! - Reordering of concurrently fetched pages
//! - Overall harvest coordination

mod coordinator;
mod directory;
mod fetcher;
mod item;
mod merge;
mod naver;
mod page;
mod parser;
mod scheduler;

#[cfg(test)]
mod testutil;

pub use coordinator::{resolve_sources, run_harvest, CrawlOutcome, HarvestReport, Harvester};
pub use directory::{ListedCompanyDirectory, StaticDirectory};
pub use fetcher::{build_http_client, fetch_document, format_user_agent, post_form_document};
pub use item::fetch_item;
pub use merge::merge;
pub use naver::NaverBoard;
pub use page::fetch_page;
pub use parser::{pad_source_code, parse_board_time, parse_listing, parse_post, parse_source_table};
pub use scheduler::{CancellationSignal, PaginationScheduler};
