//! Source enumeration from the exchange's listed-company download

use crate::board::{Source, SourceDirectory};
use crate::config::OriginConfig;
use crate::crawler::fetcher::post_form_document;
use crate::crawler::parser::parse_source_table;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Form fields requesting every listed corporation, newest listing first
const LIST_FORM: [(&str, &str); 6] = [
    ("method", "download"),
    ("orderMode", "1"),
    ("orderStat", "D"),
    ("searchType", "13"),
    ("fiscalYearEnd", "all"),
    ("location", "all"),
];

/// Downloads the listed-company table and reads its source codes
pub struct ListedCompanyDirectory {
    client: Client,
    url: Url,
    charset: String,
}

impl ListedCompanyDirectory {
    pub fn new(client: Client, origin: &OriginConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            url: Url::parse(&origin.source_list_url)?,
            charset: origin.source_list_charset.clone(),
        })
    }
}

#[async_trait]
impl SourceDirectory for ListedCompanyDirectory {
    async fn list_sources(&self) -> Result<Vec<Source>, FetchError> {
        let html = post_form_document(&self.client, &self.url, &LIST_FORM, &self.charset).await?;
        let sources = parse_source_table(&html, &self.url)?;
        tracing::info!("Source list downloaded: {} sources", sources.len());
        Ok(sources)
    }
}

/// Fixed list of sources, used when sources are named explicitly
pub struct StaticDirectory {
    sources: Vec<Source>,
}

impl StaticDirectory {
    pub fn new(mut sources: Vec<Source>) -> Self {
        sources.sort();
        sources.dedup();
        Self { sources }
    }
}

#[async_trait]
impl SourceDirectory for StaticDirectory {
    async fn list_sources(&self) -> Result<Vec<Source>, FetchError> {
        Ok(self.sources.clone())
    }
}
