//! Shared fixtures for the integration tests

use news_harvest::config::{parse_config, Config};
use news_harvest::Record;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a VnExpress-style configuration pointed at the mock server
pub fn test_config(server: &MockServer, batch_target: usize, buffer_limit: usize) -> Config {
    site_config(server, "vnexpress", batch_target, buffer_limit)
}

/// Builds a configuration for `site` pointed at the mock server
pub fn site_config(
    server: &MockServer,
    site: &str,
    batch_target: usize,
    buffer_limit: usize,
) -> Config {
    parse_config(&format!(
        r#"
[crawler]
site = "{site}"
days-ago = 1
batch-target = {batch_target}

[http]
user-agent = "TestHarvester/1.0"
timeout-secs = 5
max-in-flight = 4

[output]
database-path = "./unused.db"
buffer-limit = {buffer_limit}

[endpoints]
site-url = "{uri}"
comment-url = "{uri}"
"#,
        uri = server.uri()
    ))
    .expect("test config should parse")
}

/// Renders a listing page holding articles given as `objectid-objecttype`
pub fn listing_page(identifiers: &[&str], next: Option<&str>) -> String {
    let articles: String = identifiers
        .iter()
        .map(|identifier| {
            let (id, kind) = identifier.split_once('-').expect("identifier is id-type");
            format!(
                r#"<article class="item-news item-news-common">
                    <h3 class="title-news"><a href="/{id}.html">Article {id}</a></h3>
                    <span class="txt_num_comment" data-objectid="{id}" data-objecttype="{kind}"></span>
                </article>"#
            )
        })
        .collect();

    let next = next
        .map(|href| format!(r#"<a class="btn-page next-page" href="{href}">Next</a>"#))
        .unwrap_or_default();

    format!("<html><body>{articles}{next}</body></html>")
}

/// Serves a listing page at `at`
pub async fn mount_listing(server: &MockServer, at: &str, identifiers: &[&str], next: Option<&str>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(identifiers, next)))
        .mount(server)
        .await;
}

/// Serves the count widget for one exact `cid` list
pub async fn mount_counts(server: &MockServer, counts: &[(&str, u32)]) {
    let cid = counts
        .iter()
        .map(|(identifier, _)| *identifier)
        .collect::<Vec<_>>()
        .join(";");
    let body: String = counts
        .iter()
        .map(|(identifier, count)| {
            format!("CmtWidget.parse('widget-comment-{}', {});", identifier, count)
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/widget/index/"))
        .and(query_param("cid", cid.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// JSON body of a comment or reply response: `(comment_id, likes, replies)`
pub fn comments_body(items: &[(u64, i64, u32)]) -> String {
    let items: Vec<_> = items
        .iter()
        .map(|(id, likes, replies)| {
            serde_json::json!({
                "comment_id": id,
                "userlike": likes,
                "replys": { "total": replies },
            })
        })
        .collect();
    serde_json::json!({ "error": 0, "data": { "total": items.len(), "items": items } }).to_string()
}

/// Serves the top-level comments of one article
pub async fn mount_comments(server: &MockServer, object_id: &str, items: &[(u64, i64, u32)]) {
    Mock::given(method("GET"))
        .and(path("/index/get"))
        .and(query_param("objectid", object_id))
        .respond_with(ResponseTemplate::new(200).set_body_string(comments_body(items)))
        .mount(server)
        .await;
}

/// Serves the replies of one comment
pub async fn mount_replies(server: &MockServer, comment_id: &str, items: &[(u64, i64, u32)]) {
    Mock::given(method("GET"))
        .and(path("/index/getreplay"))
        .and(query_param("id", comment_id))
        .respond_with(ResponseTemplate::new(200).set_body_string(comments_body(items)))
        .mount(server)
        .await;
}

/// A freshly crawled record, before scoring
pub fn crawled(server: &MockServer, identifier: &str) -> Record {
    let (id, kind) = identifier.split_once('-').expect("identifier is id-type");
    Record {
        url: format!("{}/{}.html", server.uri(), id),
        title: format!("Article {}", id),
        identifier: identifier.to_string(),
        article_id: id.to_string(),
        article_type: kind.to_string(),
        category: None,
        comment_count: 0,
        score: 0,
    }
}

/// Paths of every request the mock server has received, in order
pub async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}
