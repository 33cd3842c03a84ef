//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests for listing and detail pages
//! - The form POST that downloads the source list
//! - Error classification into `FetchError`
//!
//! Nothing here retries. A failed request surfaces to the caller, which
//! abandons the whole source.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::FetchError;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Crawler settings carrying the request and connect timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use board_harvest::config::{CrawlerConfig, UserAgentConfig};
/// use board_harvest::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "BoardHarvest".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format_user_agent(user_agent))
        .timeout(Duration::from_secs(crawler.request_timeout))
        .connect_timeout(Duration::from_secs(crawler.connect_timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the user agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn format_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Fetches a document with GET and returns its decoded body
///
/// The body is decoded using the charset announced by the response.
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Timeout | `FetchError::Timeout` |
/// | Connection / body read failure | `FetchError::Network` |
/// | Non-2xx status | `FetchError::Status` |
pub async fn fetch_document(client: &Client, url: &Url) -> Result<String, FetchError> {
    tracing::trace!("GET {}", url);
    let response = send(client.get(url.clone()), url.as_str()).await?;

    response.text().await.map_err(|e| FetchError::Network {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Posts a form and decodes the body with an explicit charset
///
/// Used for endpoints that serve legacy-encoded tables without announcing
/// the charset.
pub async fn post_form_document(
    client: &Client,
    url: &Url,
    form: &[(&str, &str)],
    charset: &str,
) -> Result<String, FetchError> {
    tracing::trace!("POST {}", url);
    let response = send(client.post(url.clone()).form(form), url.as_str()).await?;

    response
        .text_with_charset(charset)
        .await
        .map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })
}

async fn send(request: RequestBuilder, url: &str) -> Result<reqwest::Response, FetchError> {
    let response = request.send().await.map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Maps a transport error onto the fetch taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
