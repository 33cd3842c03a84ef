use crate::board::{IdentityKind, Source};
use serde::Deserialize;

/// Main configuration structure for Board-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub origin: OriginConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of listing pages fetched concurrently for one source
    #[serde(rename = "page-workers", default = "default_page_workers")]
    pub page_workers: u32,

    /// Maximum number of posts fetched concurrently within one page
    #[serde(rename = "item-workers", default = "default_item_workers")]
    pub item_workers: u32,

    /// Which post field is used as checkpoint and ordering key
    #[serde(default)]
    pub identity: IdentityKind,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_workers: default_page_workers(),
            item_workers: default_item_workers(),
            identity: IdentityKind::default(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Where boards and the source list are fetched from
#[derive(Debug, Clone, Deserialize)]
pub struct OriginConfig {
    /// Base URL of the board site; post links are resolved against it
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Path of the listing page, queried with `code` and `page`
    #[serde(rename = "board-path", default = "default_board_path")]
    pub board_path: String,

    /// Endpoint serving the listed-company table
    #[serde(rename = "source-list-url", default = "default_source_list_url")]
    pub source_list_url: String,

    /// Character set of the listed-company table
    #[serde(rename = "source-list-charset", default = "default_source_list_charset")]
    pub source_list_charset: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            board_path: default_board_path(),
            source_list_url: default_source_list_url(),
            source_list_charset: default_source_list_charset(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Explicit source selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    /// Source codes to crawl; empty means "download the full list"
    #[serde(default)]
    pub codes: Vec<String>,
}

impl SourcesConfig {
    pub fn to_sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.codes.iter().map(|c| Source::new(c.as_str())).collect();
        sources.sort();
        sources.dedup();
        sources
    }
}

fn default_page_workers() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
        .min(64)
}

fn default_item_workers() -> u32 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_base_url() -> String {
    "https://finance.naver.com".to_string()
}

fn default_board_path() -> String {
    "/item/board.nhn".to_string()
}

fn default_source_list_url() -> String {
    "http://kind.krx.co.kr/corpgeneral/corpList.do".to_string()
}

fn default_source_list_charset() -> String {
    "euc-kr".to_string()
}
