//! Shared fixtures: board HTML, mock mounting and test configuration

use board_harvest::board::Source;
use board_harvest::config::{
    Config, CrawlerConfig, OriginConfig, OutputConfig, SourcesConfig, UserAgentConfig,
};
use board_harvest::storage::{SqliteStorage, Storage};
use board_harvest::IdentityKind;
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOARD_PATH: &str = "/item/board.nhn";
pub const READ_PATH: &str = "/item/board_read.nhn";
pub const SOURCE_LIST_PATH: &str = "/corpgeneral/corpList.do";

/// Listing pages of one board: page 1 first, rows newest first
pub type Pages = Vec<Vec<(u64, &'static str)>>;

/// Renders a listing page the way the board lays it out
pub fn listing_html(source: &str, rows: &[(u64, &str)], last_page: u32) -> String {
    let mut html = String::from(
        r#"<html><body><table class="type2"><tbody>
        <tr><th>날짜</th><th>제목</th><th>글쓴이</th><th>조회</th></tr>"#,
    );

    for (id, minute) in rows {
        html.push_str(&format!(
            r#"<tr>
                <td><span class="tah p10 gray03">{minute}</span></td>
                <td class="title"><a href="{READ_PATH}?code={source}&nid={id}&st=&sw=&page=1" title="post {id}">post {id}</a></td>
                <td class="p11"><span>writer****</span></td>
                <td><span class="tah p10 gray03">{id}</span></td>
            </tr>"#,
        ));
    }

    html.push_str("</tbody></table>");
    if last_page > 1 {
        html.push_str(&format!(
            r#"<table class="Nnavi"><tr>
                <td class="pgRR"><a href="{BOARD_PATH}?code={source}&page={last_page}">맨뒤</a></td>
            </tr></table>"#,
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Renders a post detail page
pub fn post_html(id: u64, minute: &str) -> String {
    format!(
        r#"<html><body>
        <table class="view">
            <tr>
                <th class="gray03 p9 tah">{minute}</th>
                <th class="gray03 p9 tah">조회 <span>{views}</span> 공감 <span>3</span> 비공감 <span>1</span> 의견 <span>의견없음</span></th>
            </tr>
        </table>
        <div id="body">body of {id}&#13;second line</div>
        </body></html>"#,
        views = id * 10,
    )
}

/// Mounts every listing page and post detail of `source`
///
/// `post_fetches` sets how often each detail page must be requested by the
/// time the server is dropped; `None` leaves it unchecked.
pub async fn mount_board(server: &MockServer, source: &str, pages: &Pages, post_fetches: Option<u64>) {
    let last_page = pages.len().max(1) as u32;

    for (index, rows) in pages.iter().enumerate() {
        let page = (index + 1).to_string();
        Mock::given(method("GET"))
            .and(path(BOARD_PATH))
            .and(query_param("code", source))
            .and(query_param("page", page.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_html(source, rows, last_page))
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(server)
            .await;

        for (id, minute) in rows {
            let mut mock = Mock::given(method("GET"))
                .and(path(READ_PATH))
                .and(query_param("code", source))
                .and(query_param("nid", id.to_string().as_str()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(post_html(*id, minute))
                        .insert_header("content-type", "text/html; charset=utf-8"),
                );
            if let Some(times) = post_fetches {
                mock = mock.expect(times);
            }
            mock.mount(server).await;
        }
    }

    if pages.is_empty() {
        Mock::given(method("GET"))
            .and(path(BOARD_PATH))
            .and(query_param("code", source))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_html(source, &[], 1))
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(server)
            .await;
    }
}

/// Makes every listing request of `source` fail with `status`
pub async fn mount_broken_board(server: &MockServer, source: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(BOARD_PATH))
        .and(query_param("code", source))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serves the listed-company table with the given codes
pub async fn mount_source_list(server: &MockServer, codes: &[&str]) {
    let mut html = String::from(
        "<html><body><table><tr><th>회사명</th><th>종목코드</th><th>업종</th></tr>",
    );
    for code in codes {
        html.push_str(&format!("<tr><td>company</td><td>{}</td><td>sector</td></tr>", code));
    }
    html.push_str("</table></body></html>");

    Mock::given(method("POST"))
        .and(path(SOURCE_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .expect(1)
        .mount(server)
        .await;
}

/// Requests made to listing page `page` of `source`
pub async fn listing_requests(server: &MockServer, source: &str, page: u32) -> usize {
    let page = page.to_string();
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == BOARD_PATH)
        .filter(|request| {
            let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
            pairs.contains(&("code".to_string(), source.to_string()))
                && pairs.contains(&("page".to_string(), page.clone()))
        })
        .count()
}

/// Creates a test configuration pointing every origin at `server_uri`
pub fn test_config(server_uri: &str, db_path: &Path, codes: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            page_workers: 1,
            item_workers: 3,
            identity: IdentityKind::PostId,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        origin: OriginConfig {
            base_url: server_uri.to_string(),
            board_path: BOARD_PATH.to_string(),
            source_list_url: format!("{}{}", server_uri, SOURCE_LIST_PATH),
            source_list_charset: "utf-8".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        },
        sources: SourcesConfig {
            codes: codes.iter().map(|c| c.to_string()).collect(),
        },
    }
}

/// Stored post ids of `source`, ascending
pub fn stored_ids(db_path: &Path, source: &str) -> Vec<u64> {
    let storage = SqliteStorage::new(db_path).expect("Failed to open DB");
    storage
        .get_posts(&Source::new(source))
        .expect("Failed to read posts")
        .iter()
        .map(|post| post.post_id)
        .collect()
}
