//! HTML parsers for board listings, post details and the source list
//!
//! This module turns raw documents into typed records:
//! - Listing pages into ordered `PostRef`s plus the board's page count
//! - Post detail pages into `Post`s
//! - The listed-company table into `Source`s
//!
//! Any element that is missing or malformed yields `FetchError::Parse`; a
//! partially parsed record is never returned.

use crate::board::{Listing, Post, PostRef, Source, BOARD_TIME_FORMAT};
use crate::FetchError;
use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Opinion label the board shows when the author stated none
const NO_OPINION: &str = "의견없음";

/// Header of the source code column in the listed-company table
const SOURCE_CODE_HEADER: &str = "종목코드";

/// Parses a listing page into post references and the page count
///
/// # Extraction Rules
///
/// - Each `td.title > a` is one post, in display order (newest first)
/// - The post id is the `nid` query parameter of the anchor's `href`
/// - The title is the anchor's `title` attribute, falling back to its text
/// - The row's first `td span` holding a `YYYY.MM.DD HH:MM` time is the listed time
/// - The page count is the `page` parameter of `td.pgRR > a`, or 1 when absent
///
/// # Example
///
/// ```
/// use board_harvest::board::Source;
/// use board_harvest::crawler::parse_listing;
/// use url::Url;
///
/// let html = r#"<table><tr>
///     <td><span>2024.01.02 10:00</span></td>
///     <td class="title"><a href="/item/board_read.nhn?code=000001&nid=150" title="hello">hello</a></td>
/// </tr></table>"#;
/// let url = Url::parse("https://finance.naver.com/item/board.nhn?code=000001&page=1").unwrap();
/// let listing = parse_listing(html, &url, &Source::new("000001")).unwrap();
/// assert_eq!(listing.entries[0].post_id, 150);
/// assert_eq!(listing.last_page, 1);
/// ```
pub fn parse_listing(html: &str, page_url: &Url, source: &Source) -> Result<Listing, FetchError> {
    let document = Html::parse_document(html);
    let anchor_selector = selector("td.title > a", page_url)?;
    let time_selector = selector("td span", page_url)?;

    let mut entries = Vec::new();
    for anchor in document.select(&anchor_selector) {
        let href = anchor
            .value()
            .attr("href")
            .ok_or_else(|| parse_error(page_url, "post link without href"))?;

        let url = page_url
            .join(href)
            .map_err(|e| parse_error(page_url, format!("bad post link '{}': {}", href, e)))?;

        let post_id = query_value(&url, "nid")
            .and_then(|nid| nid.parse::<u64>().ok())
            .ok_or_else(|| parse_error(page_url, format!("post link '{}' has no nid", href)))?;

        let title = anchor
            .value()
            .attr("title")
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| element_text(&anchor));

        let listed_at = row_of(&anchor).and_then(|row| {
            row.select(&time_selector)
                .find_map(|span| parse_board_time(&element_text(&span)))
        });

        entries.push(PostRef {
            source: source.clone(),
            post_id,
            url,
            title,
            listed_at,
        });
    }

    let last_page = parse_last_page(&document, page_url)?;

    Ok(Listing { entries, last_page })
}

/// Extracts the page count from the "last page" pagination link
fn parse_last_page(document: &Html, page_url: &Url) -> Result<u32, FetchError> {
    let last_selector = selector("td.pgRR > a", page_url)?;

    let Some(link) = document.select(&last_selector).next() else {
        return Ok(1);
    };

    link.value()
        .attr("href")
        .and_then(|href| page_url.join(href).ok())
        .and_then(|url| query_value(&url, "page"))
        .and_then(|page| page.parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .ok_or_else(|| parse_error(page_url, "unreadable last-page link"))
}

/// Parses a post detail page
///
/// The id and title come from the listing reference; everything else is read
/// from the detail document:
///
/// - Timestamp: `th.gray03.p9.tah`
/// - Counters: the second header cell of its row, text nodes in the order
///   label, views, label, agree, label, disagree, label, opinion
/// - Body: `#body`, with carriage returns normalised to newlines
pub fn parse_post(html: &str, post_ref: &PostRef) -> Result<Post, FetchError> {
    let url = &post_ref.url;
    let document = Html::parse_document(html);

    let date_selector = selector("th.gray03.p9.tah", url)?;
    let info_selector = selector("tr > th:nth-of-type(2)", url)?;
    let body_selector = selector("#body", url)?;

    let date_text = document
        .select(&date_selector)
        .next()
        .map(|th| element_text(&th))
        .ok_or_else(|| parse_error(url, "missing post timestamp"))?;
    let posted_at = parse_board_time(&date_text)
        .ok_or_else(|| parse_error(url, format!("unreadable post timestamp '{}'", date_text)))?;

    let info = document
        .select(&info_selector)
        .next()
        .ok_or_else(|| parse_error(url, "missing post counters"))?;
    let tokens: Vec<&str> = info
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let views = counter(&tokens, 1, "views", url)?;
    let agree = counter(&tokens, 3, "agree", url)?;
    let disagree = counter(&tokens, 5, "disagree", url)?;
    let opinion = tokens
        .get(7)
        .filter(|o| **o != NO_OPINION)
        .map(|o| o.to_string());

    let body = document
        .select(&body_selector)
        .next()
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .replace("\u{a0}\r", "\n")
                .replace('\r', "\n")
        })
        .ok_or_else(|| parse_error(url, "missing post body"))?;

    Ok(Post {
        id: post_ref.post_id,
        posted_at,
        display_rank: 0,
        title: post_ref.title.clone(),
        views,
        agree,
        disagree,
        opinion,
        body,
    })
}

/// Parses the listed-company table into sources
///
/// The first row containing a `종목코드` cell is the header; numeric codes are
/// zero-padded to six digits. The result is sorted and de-duplicated.
pub fn parse_source_table(html: &str, url: &Url) -> Result<Vec<Source>, FetchError> {
    let document = Html::parse_document(html);
    let row_selector = selector("tr", url)?;
    let cell_selector = selector("th, td", url)?;

    let mut code_column = None;
    let mut sources = Vec::new();

    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| element_text(&cell))
            .collect();

        match code_column {
            None => {
                code_column = cells.iter().position(|c| c == SOURCE_CODE_HEADER);
            }
            Some(column) => {
                if let Some(code) = cells.get(column).filter(|c| !c.is_empty()) {
                    sources.push(Source::new(pad_source_code(code)));
                }
            }
        }
    }

    if code_column.is_none() {
        return Err(parse_error(url, "source list has no code column"));
    }

    sources.sort();
    sources.dedup();
    Ok(sources)
}

/// Zero-pads purely numeric codes to six digits ("5930" -> "005930")
pub fn pad_source_code(code: &str) -> String {
    let code = code.trim();
    if code.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>6}", code)
    } else {
        code.to_string()
    }
}

/// Parses a board timestamp such as `2024.01.02 10:00`
pub fn parse_board_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), BOARD_TIME_FORMAT).ok()
}

fn counter(tokens: &[&str], index: usize, name: &str, url: &Url) -> Result<u64, FetchError> {
    let raw = tokens
        .get(index)
        .ok_or_else(|| parse_error(url, format!("missing {} counter", name)))?;

    raw.replace(',', "")
        .parse::<u64>()
        .map_err(|_| parse_error(url, format!("unreadable {} counter '{}'", name, raw)))
}

/// The `tr` enclosing a `td > a` cell link
fn row_of<'a>(anchor: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    anchor
        .parent()
        .and_then(|cell| cell.parent())
        .and_then(ElementRef::wrap)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn selector(css: &str, url: &Url) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| parse_error(url, format!("selector '{}': {:?}", css, e)))
}

fn parse_error(url: &Url, message: impl Into<String>) -> FetchError {
    FetchError::Parse {
        url: url.to_string(),
        message: message.into(),
    }
}
