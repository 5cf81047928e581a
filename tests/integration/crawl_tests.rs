//! Frontier crawl waves against a mock listing site

use crate::common::{mount_listing, test_config};
use futures::TryStreamExt;
use news_harvest::crawler::FrontierCrawler;
use news_harvest::gateway::Gateway;
use news_harvest::site::build_site;
use news_harvest::{HarvestError, Stage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_two_start_queries_one_wave_one_batch() {
    let server = MockServer::start().await;
    mount_listing(&server, "/cat-a", &["1-1", "2-1"], None).await;
    mount_listing(&server, "/cat-b", &["3-1", "4-2"], None).await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let starts = vec![
        format!("{}/cat-a", server.uri()),
        format!("{}/cat-b", server.uri()),
    ];

    let mut crawler = FrontierCrawler::new(&gateway, build_site(&config), starts, 25);
    let batch = crawler.next_batch().await.unwrap().unwrap();

    assert_eq!(batch.len(), 4);
    assert_eq!(crawler.waves(), 1);
    let identifiers: Vec<_> = batch.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["1-1", "2-1", "3-1", "4-2"]);

    assert!(crawler.next_batch().await.unwrap().is_none());
}

#[tokio::test]
async fn test_follows_next_pages_until_exhausted() {
    let server = MockServer::start().await;
    mount_listing(&server, "/p1", &["1-1", "2-1"], Some("/p2")).await;
    mount_listing(&server, "/p2", &["3-1"], Some("/p3")).await;
    mount_listing(&server, "/p3", &["4-1", "5-1"], None).await;

    let config = test_config(&server, 2, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let crawler = FrontierCrawler::new(
        &gateway,
        build_site(&config),
        vec![format!("{}/p1", server.uri())],
        2,
    );

    let batches: Vec<_> = crawler.into_stream().try_collect().await.unwrap();
    let sizes: Vec<_> = batches.iter().map(Vec::len).collect();

    // p1 fills a batch on its own; p2 is short, so p3 is aggregated onto it
    assert_eq!(sizes, vec![2, 3]);
    assert_eq!(batches[1][0].identifier, "3-1");
}

#[tokio::test]
async fn test_disabled_next_link_is_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/last"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
            <article class="item-news-common">
                <h3><a href="/9.html">Nine</a></h3>
                <span class="txt_num_comment" data-objectid="9" data-objecttype="1"></span>
            </article>
            <a class="next-page disable" href="/beyond">Next</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let crawler = FrontierCrawler::new(
        &gateway,
        build_site(&config),
        vec![format!("{}/last", server.uri())],
        25,
    );

    let batches: Vec<_> = crawler.into_stream().try_collect().await.unwrap();
    assert_eq!(batches.len(), 1);

    let paths: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/last"]);
}

#[tokio::test]
async fn test_transport_error_aborts_crawl_with_wave() {
    let server = MockServer::start().await;
    mount_listing(&server, "/p1", &["1-1"], Some("/gone")).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let crawler = FrontierCrawler::new(
        &gateway,
        build_site(&config),
        vec![format!("{}/p1", server.uri())],
        25,
    );

    let err = crawler
        .into_stream()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::CrawlWave(2)));
    match err {
        HarvestError::Transport { source, .. } => assert!(source.url().ends_with("/gone")),
        other => panic!("expected transport error, got {}", other),
    }
}
